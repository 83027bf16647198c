//! Temporary service environment built from fakes

use reel_gen::config::{PlannerProvider, ServiceConfig};
use reel_gen::models::{Brief, JobView};
use reel_gen::services::{DurationProbe, JobRegistry, PlanGenerator, Providers, SpeechProvider};
use reel_gen::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::fakes::{FakeSpeech, RecordingEncoder, ScriptedPlanner, WordRateProbe};

/// Defaults with fast timeouts and the offline planner
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.planner.provider = PlannerProvider::Template;
    config.narration.timeout_secs = 2;
    config.composition.width = 540;
    config.composition.height = 960;
    config
}

pub fn brief(target_duration: f64) -> Brief {
    Brief {
        brand_name: "Northwind Coffee".to_string(),
        description: "Small-batch roasts delivered the morning they are roasted".to_string(),
        audience: "remote workers".to_string(),
        tone: "energetic".to_string(),
        target_duration,
        call_to_action: "Order your first bag today.".to_string(),
    }
}

/// Service state rooted in a temp folder
pub struct TestEnv {
    pub temp: tempfile::TempDir,
    pub state: AppState,
    pub encoder: Arc<RecordingEncoder>,
}

impl TestEnv {
    pub fn builder() -> TestEnvBuilder {
        TestEnvBuilder {
            config: test_config(),
            planner: Arc::new(ScriptedPlanner::new(&[
                ("Meet Northwind Coffee, roasted this morning.", 5.0),
                ("Every bag ships the day it is roasted.", 5.0),
                ("Order your first bag today.", 5.0),
            ])),
            primary: Arc::new(FakeSpeech::new("primary")),
            fallback: None,
            probe: Arc::new(WordRateProbe),
            encoder: Arc::new(RecordingEncoder::succeeding()),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.state.registry
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp.path().join("output")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.temp.path().join("work")
    }

    /// Register a job and run it to completion on the current task
    pub async fn run_job(&self, brief: Brief) -> (Uuid, JobView) {
        let id = self.state.registry.create().await;
        self.state.orchestrator.run(id, brief).await;
        let view = self.state.registry.get(id).await.unwrap();
        (id, view)
    }
}

pub struct TestEnvBuilder {
    config: ServiceConfig,
    planner: Arc<dyn PlanGenerator>,
    primary: Arc<dyn SpeechProvider>,
    fallback: Option<Arc<dyn SpeechProvider>>,
    probe: Arc<dyn DurationProbe>,
    encoder: Arc<RecordingEncoder>,
}

impl TestEnvBuilder {
    pub fn config(mut self, f: impl FnOnce(&mut ServiceConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn planner(mut self, planner: Arc<dyn PlanGenerator>) -> Self {
        self.planner = planner;
        self
    }

    pub fn speech(
        mut self,
        primary: Arc<dyn SpeechProvider>,
        fallback: Option<Arc<dyn SpeechProvider>>,
    ) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    pub fn probe(mut self, probe: Arc<dyn DurationProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn encoder(mut self, encoder: RecordingEncoder) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    pub fn build(self) -> TestEnv {
        let temp = tempfile::tempdir().unwrap();
        let output_dir = temp.path().join("output");
        let work_dir = temp.path().join("work");
        std::fs::create_dir_all(&output_dir).unwrap();
        std::fs::create_dir_all(&work_dir).unwrap();

        let providers = Providers {
            planner: self.planner,
            primary_speech: self.primary,
            fallback_speech: self.fallback,
            probe: self.probe,
            transcriber: None,
            encoder: self.encoder.clone(),
        };
        let state = AppState::new(&self.config, providers, output_dir, work_dir);

        TestEnv {
            temp,
            state,
            encoder: self.encoder,
        }
    }
}

/// Poll the registry until the job is Completed or Failed
pub async fn wait_for_terminal(registry: &JobRegistry, id: Uuid) -> JobView {
    for _ in 0..500 {
        let view = registry.get(id).await.unwrap();
        if view.status.is_terminal() {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish in time", id);
}
