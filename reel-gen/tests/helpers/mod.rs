//! Test Helper Utilities
//!
//! Shared fakes and fixtures for testing reel-gen

#![allow(dead_code)]

pub mod fakes;
pub mod test_env;

pub use fakes::{
    FailingProbe, FakeSpeech, GatedPlanner, RecordedRun, RecordingEncoder, ScriptedPlanner,
    StalledSpeech, WordRateProbe, WorkspaceWipingSpeech,
};
pub use test_env::{brief, test_config, wait_for_terminal, TestEnv};
