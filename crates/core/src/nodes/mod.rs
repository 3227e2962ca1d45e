//! Built-in node implementations.

pub mod image_set;
pub mod outpaint;
pub mod prompt_template;
