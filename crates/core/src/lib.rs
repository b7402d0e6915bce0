#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod navigator;
pub mod progress;
pub mod time;
pub mod tree;

pub use error::Error;
pub use navigator::LessonNavigator;
pub use progress::ProgressStats;
pub use time::Clock;
pub use tree::{CourseTree, LessonNode, ModuleNode};
