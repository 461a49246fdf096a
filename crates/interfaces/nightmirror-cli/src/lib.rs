pub mod cli;
pub mod commands;
pub mod logging;
pub mod run;
pub mod supervisor_link;

use clap::ValueEnum;
use nightmirror_core::ComparePolicy;

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum CliComparePolicy {
    Shallow,
    Content,
}

impl From<CliComparePolicy> for ComparePolicy {
    fn from(p: CliComparePolicy) -> Self {
        match p {
            CliComparePolicy::Shallow => ComparePolicy::Shallow,
            CliComparePolicy::Content => ComparePolicy::Content,
        }
    }
}
