pub mod command;
pub mod ecs;
pub mod logs;
pub mod sts;
