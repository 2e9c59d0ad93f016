pub mod config_cmd;
pub mod form;
pub mod output;
pub mod read_cmd;
pub mod renderer;
