//! End-to-end pipeline runs against a mock content host and mock models

use anyhow::Result;
use async_trait::async_trait;
use graphlens::analysis::AnalysisRecord;
use graphlens::config::{FetchSettings, RepoTarget};
use graphlens::llm::{ChatMessage, ChatModel, FileAnalyzer, LlmResponse, MockChatModel};
use graphlens::pipeline::{Pipeline, PipelineOptions, SourcePlan};
use graphlens::source::{GitHubSource, LocalSource, RepoCloner};
use graphlens::storage::{load_table, CacheStore, CacheTable};
use graphlens::{PipelineError, RunReport};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLAIN_REPLY: &str =
    r#"{"hasDockerIntegration": false, "summary": "Plain module", "fileType": "utility", "keyFunctions": []}"#;

const DOCKER_REPLY: &str = r#"```json
{
  "hasDockerIntegration": true,
  "dockerApis": [{"apiType": "container", "description": "Creates sandbox containers", "line": 3}],
  "dockerTools": ["dockerode"],
  "summary": "Docker client wrapper",
  "fileType": "service",
  "keyFunctions": ["createSandbox"]
}
```"#;

fn write_elements(dir: &Path, files: &[&str]) -> PathBuf {
    let mut elements: Vec<serde_json::Value> = files
        .iter()
        .map(|f| serde_json::json!({"data": {"id": f}}))
        .collect();
    // Edges between consecutive files, which must never be processed
    for pair in files.windows(2) {
        elements.push(serde_json::json!({
            "data": {"id": format!("{}->{}", pair[0], pair[1]), "source": pair[0], "target": pair[1]}
        }));
    }

    let path = dir.join("cytoscape-elements.json");
    std::fs::write(&path, serde_json::to_string(&elements).unwrap()).unwrap();
    path
}

async fn serve_all_ts(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/raw/acme/web/main/[a-z0-9_]+\.ts$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("export const x = 1;"))
        .mount(server)
        .await;
}

fn network_plan(server: &MockServer) -> SourcePlan {
    let settings = FetchSettings {
        raw_base_url: format!("{}/raw", server.uri()),
        api_base_url: format!("{}/api", server.uri()),
        timeout_secs: 5,
        request_delay_ms: 0,
        ..Default::default()
    };
    let source = GitHubSource::new(RepoTarget::new("acme/web", "main"), &settings).unwrap();
    SourcePlan::Network(source)
}

fn pipeline(cache: &Path, model: Arc<dyn ChatModel>, cancel: CancellationToken) -> Pipeline {
    let options = PipelineOptions {
        flush_interval: 5,
        request_delay: Duration::ZERO,
    };
    Pipeline::new(CacheStore::open(cache), FileAnalyzer::new(model), options, cancel)
}

fn disk_len(dir: &Path, table: CacheTable) -> usize {
    load_table::<serde_json::Value>(&table.path_in(dir)).len()
}

fn numbered(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("file{}.ts", i)).collect()
}

/// Cancels the token after a fixed number of model calls
struct CancelAfter {
    inner: MockChatModel,
    token: CancellationToken,
    after: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl ChatModel for CancelAfter {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let reply = self.inner.chat(messages).await;
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
            self.token.cancel();
        }
        reply
    }
}

/// Records how many entries each cache document holds on disk at every call
struct DiskProbe {
    dir: PathBuf,
    seen: Mutex<Vec<[usize; 3]>>,
}

#[async_trait]
impl ChatModel for DiskProbe {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<LlmResponse> {
        let counts = [
            disk_len(&self.dir, CacheTable::Combined),
            disk_len(&self.dir, CacheTable::Summaries),
            disk_len(&self.dir, CacheTable::DockerAnalysis),
        ];
        self.seen.lock().unwrap().push(counts);
        Ok(LlmResponse {
            content: PLAIN_REPLY.to_string(),
            tokens_used: None,
        })
    }
}

#[tokio::test]
async fn test_network_run_with_path_and_branch_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw/acme/web/main/docker_client.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("new Docker()"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/acme/web/main/src/foo/bar.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("bar"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/acme/web/master/legacy.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("legacy"))
        .mount(&server)
        .await;

    let elements = write_elements(
        dir.path(),
        &["docker_client.ts", "foo/bar.ts", "legacy.ts", "gone.ts"],
    );

    let mut model = MockChatModel::new().with_default(PLAIN_REPLY);
    model.add_response("docker_client.ts", DOCKER_REPLY);

    let cache = dir.path().join("cache");
    let mut pipeline = pipeline(&cache, Arc::new(model), CancellationToken::new());
    let report = pipeline.run(&elements, network_plan(&server)).await.unwrap();

    assert_eq!(report.candidates, 4);
    assert_eq!(report.pending, 4);
    assert_eq!(report.analyzed, 3);
    assert_eq!(report.fetch_misses, 1);
    assert!(!report.interrupted);

    let store = CacheStore::open(&cache);
    let keys: Vec<&str> = store.records().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["docker_client.ts", "foo/bar.ts", "legacy.ts"]);

    // All three tables agree for every recorded file
    for (path, record) in store.records() {
        assert_eq!(store.summary(path), Some(record.summary.as_str()));
        assert_eq!(store.docker_analysis(path), Some(&record.docker_view()));
    }

    let docker = store.get("docker_client.ts").unwrap();
    assert!(docker.has_docker_integration);
    assert_eq!(docker.docker_tools, vec!["dockerode"]);
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    serve_all_ts(&server).await;

    let elements = write_elements(dir.path(), &["a.ts", "b.ts", "c.ts"]);

    let first = Arc::new(MockChatModel::new().with_default(PLAIN_REPLY));
    pipeline(dir.path(), first.clone(), CancellationToken::new())
        .run(&elements, network_plan(&server))
        .await
        .unwrap();
    let combined = CacheTable::Combined.path_in(dir.path());
    let after_first = std::fs::read_to_string(&combined).unwrap();

    let second = Arc::new(MockChatModel::new().with_default(DOCKER_REPLY));
    let report = pipeline(dir.path(), second.clone(), CancellationToken::new())
        .run(&elements, network_plan(&server))
        .await
        .unwrap();

    assert_eq!(report.pending, 0);
    assert_eq!(report.attempted, 0);
    assert_eq!(first.calls().len(), 3);
    assert!(second.calls().is_empty());
    assert_eq!(std::fs::read_to_string(&combined).unwrap(), after_first);
}

#[tokio::test]
async fn test_interrupted_run_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    serve_all_ts(&server).await;

    let files = numbered(7);
    let names: Vec<&str> = files.iter().map(String::as_str).collect();
    let elements = write_elements(dir.path(), &names);

    let token = CancellationToken::new();
    let model = CancelAfter {
        inner: MockChatModel::new().with_default(PLAIN_REPLY),
        token: token.clone(),
        after: 3,
        calls: AtomicUsize::new(0),
    };
    let report = pipeline(dir.path(), Arc::new(model), token)
        .run(&elements, network_plan(&server))
        .await
        .unwrap();

    // The file in flight when the signal arrived still completed
    assert!(report.interrupted);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.analyzed, 3);
    assert_eq!(disk_len(dir.path(), CacheTable::Combined), 3);

    let resumed = Arc::new(MockChatModel::new().with_default(PLAIN_REPLY));
    let report = pipeline(dir.path(), resumed.clone(), CancellationToken::new())
        .run(&elements, network_plan(&server))
        .await
        .unwrap();

    assert_eq!(report.pending, 4);
    assert_eq!(report.analyzed, 4);
    assert_eq!(resumed.calls().len(), 4);

    let store = CacheStore::open(dir.path());
    assert_eq!(store.len(), 7);
    for file in &files {
        assert!(store.contains(file), "{} recorded", file);
    }
}

#[tokio::test]
async fn test_unparseable_reply_still_records_file() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    serve_all_ts(&server).await;

    let elements = write_elements(dir.path(), &["weird.ts"]);
    let model = MockChatModel::new().with_default("This file looks fine to me!");

    let report = pipeline(dir.path(), Arc::new(model), CancellationToken::new())
        .run(&elements, network_plan(&server))
        .await
        .unwrap();

    assert_eq!(report.analyzed, 1);
    assert_eq!(report.degraded, 1);

    let store = CacheStore::open(dir.path());
    let record = store.get("weird.ts").unwrap();
    assert_eq!(record, &AnalysisRecord::degraded("weird.ts"));
    assert!(!record.has_docker_integration);
    assert!(record.summary.contains("weird.ts"));
}

#[tokio::test]
async fn test_model_failure_skips_file() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    serve_all_ts(&server).await;

    let elements = write_elements(dir.path(), &["ok.ts", "broken.ts"]);
    // No response configured for broken.ts, so the mock errors
    let mut model = MockChatModel::new();
    model.add_response("ok.ts", PLAIN_REPLY);

    let report = pipeline(dir.path(), Arc::new(model), CancellationToken::new())
        .run(&elements, network_plan(&server))
        .await
        .unwrap();

    assert_eq!(report.analyzed, 1);
    assert_eq!(report.analysis_failures, 1);

    let store = CacheStore::open(dir.path());
    assert!(store.contains("ok.ts"));
    assert!(!store.contains("broken.ts"));
}

#[tokio::test]
async fn test_caches_flushed_every_five_files() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    serve_all_ts(&server).await;

    let files = numbered(7);
    let names: Vec<&str> = files.iter().map(String::as_str).collect();
    let elements = write_elements(dir.path(), &names);

    let probe = Arc::new(DiskProbe {
        dir: dir.path().to_path_buf(),
        seen: Mutex::new(Vec::new()),
    });
    pipeline(dir.path(), probe.clone(), CancellationToken::new())
        .run(&elements, network_plan(&server))
        .await
        .unwrap();

    let seen = probe.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 7);
    // Nothing on disk until the fifth file completes
    assert_eq!(seen[4], [0, 0, 0]);
    // All three documents hold the first five when the sixth starts
    assert_eq!(seen[5], [5, 5, 5]);
    assert_eq!(seen[6], [5, 5, 5]);
    assert_eq!(disk_len(dir.path(), CacheTable::Combined), 7);
}

#[tokio::test]
async fn test_missing_elements_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let model = Arc::new(MockChatModel::new().with_default(PLAIN_REPLY));

    let result = pipeline(dir.path(), model.clone(), CancellationToken::new())
        .run(&dir.path().join("missing.json"), network_plan(&server))
        .await;

    assert!(matches!(result, Err(PipelineError::Input { .. })));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_failed_clone_ends_run_and_removes_scratch_dir() {
    let dir = tempfile::tempdir().unwrap();
    let elements = write_elements(dir.path(), &["a.ts"]);

    let clone_dir = dir.path().join("temp_repo_clone");
    std::fs::create_dir_all(&clone_dir).unwrap();
    std::fs::write(clone_dir.join("stale.txt"), "old").unwrap();

    let remote = dir.path().join("no-remote");
    let cloner = RepoCloner::new("acme/web", "main", &clone_dir, remote.to_string_lossy());

    let model = Arc::new(MockChatModel::new().with_default(PLAIN_REPLY));
    let result = pipeline(dir.path(), model.clone(), CancellationToken::new())
        .run(&elements, SourcePlan::LocalClone(cloner))
        .await;

    match result {
        Err(PipelineError::CloneFailed { repo, tried }) => {
            assert_eq!(repo, "acme/web");
            assert_eq!(tried, vec!["main", "master", "develop", "dev"]);
        }
        other => panic!("expected clone failure, got {:?}", other),
    }
    assert!(!clone_dir.exists());
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_local_working_copy_is_read_without_pacing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("checkout");
    std::fs::create_dir_all(root.join("src/lib")).unwrap();
    std::fs::write(root.join("index.ts"), "import './lib/db';").unwrap();
    std::fs::write(root.join("src/lib/db.ts"), "export const db = 1;").unwrap();
    std::fs::write(root.join("docker.ts"), "new Docker()").unwrap();

    let mut model = MockChatModel::new().with_default(PLAIN_REPLY);
    model.add_response("docker.ts", DOCKER_REPLY);

    let cache = dir.path().join("cache");
    // A delay this long would time the test out if it applied locally
    let options = PipelineOptions {
        flush_interval: 5,
        request_delay: Duration::from_secs(30),
    };
    let mut pipeline = Pipeline::new(
        CacheStore::open(&cache),
        FileAnalyzer::new(Arc::new(model)),
        options,
        CancellationToken::new(),
    );

    let pending: Vec<String> = ["index.ts", "lib/db.ts", "docker.ts", "gone.ts"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut report = RunReport::default();
    let started = Instant::now();
    pipeline
        .process(&pending, &LocalSource::new(&root), &mut report)
        .await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.attempted, 4);
    assert_eq!(report.analyzed, 3);
    assert_eq!(report.fetch_misses, 1);

    let store = CacheStore::open(&cache);
    assert!(store.contains("lib/db.ts"));
    assert!(store.get("docker.ts").unwrap().has_docker_integration);
    assert!(!store.contains("gone.ts"));
}
