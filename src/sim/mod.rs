pub mod world;
pub mod event;
pub mod scanner;
pub mod level;
pub mod step;
