pub mod run;

use crate::collector::config::Settings;

#[derive(Debug)]
pub enum Action {
    Run { settings: Settings },
}
