mod template;

pub use template::render_index;
