//! DockerRuntime - Docker Engine API ドライバ
//!
//! # 操作
//! - build: build context を tar にして `POST /build` に送り、ログを読み切る
//! - run: 既存コンテナを削除してから create + start
//! - verify: `http://{hostname}:{port}/` が 2xx を返すまでポーリング（30 秒）
//! - delete: コンテナを強制削除（存在しなければ成功扱い）

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::health::HealthProbe;
use crate::config::DaemonConfig;
use crate::domain::{ApplicationDescriptor, MicroserviceDescriptor, Stage};
use crate::error::CloudmeError;
use crate::packager::package_context;
use crate::ports::RuntimeAdapter;

pub struct DockerRuntime {
    client: reqwest::Client,
    base_url: String,
    context_dir: PathBuf,
    probe: HealthProbe,
}

impl DockerRuntime {
    /// Configure the client. Nothing is sent to the daemon here.
    pub fn connect(
        daemon: &DaemonConfig,
        context_dir: impl Into<PathBuf>,
    ) -> Result<Self, CloudmeError> {
        let base_url = daemon.base_url()?;

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(Duration::from_secs(10));
        if let Some(tls) = daemon.tls_material()? {
            let ca = reqwest::Certificate::from_pem(&tls.ca)
                .map_err(|e| CloudmeError::RuntimeInit(format!("invalid ca.pem: {e}")))?;
            let identity = reqwest::Identity::from_pem(&tls.identity)
                .map_err(|e| CloudmeError::RuntimeInit(format!("invalid client cert: {e}")))?;
            builder = builder.add_root_certificate(ca).identity(identity);
        }
        let client = builder
            .build()
            .map_err(|e| CloudmeError::RuntimeInit(format!("http client: {e}")))?;

        let probe = HealthProbe::new(HealthProbe::DEFAULT_TIMEOUT, HealthProbe::DEFAULT_INTERVAL)
            .map_err(|e| CloudmeError::RuntimeInit(format!("health client: {e}")))?;

        info!(endpoint = %base_url, "docker runtime ready");
        Ok(Self {
            client,
            base_url,
            context_dir: context_dir.into(),
            probe,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn remove_container(
        &self,
        stage: Stage,
        service: &MicroserviceDescriptor,
    ) -> Result<(), CloudmeError> {
        let response = self
            .client
            .delete(self.url(&format!("/containers/{}", service.name)))
            .query(&[("force", "true")])
            .send()
            .await
            .map_err(|e| CloudmeError::stage(stage, &service.name, e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => {
                debug!(service = %service.name, "removed container");
                Ok(())
            }
            _ => Err(api_error(stage, service, response).await),
        }
    }
}

#[async_trait]
impl RuntimeAdapter for DockerRuntime {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn build(
        &self,
        service: &MicroserviceDescriptor,
        app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError> {
        let archive = package_context(&self.context_dir).await?;
        let file = match tokio::fs::File::open(archive.path()).await {
            Ok(file) => file,
            Err(source) => {
                let path = archive.path().to_path_buf();
                archive.remove().await;
                return Err(CloudmeError::Packaging { path, source });
            }
        };

        let mut query = vec![
            ("t", service.image.as_str()),
            ("rm", "true"),
            ("q", "false"),
        ];
        if !service.dockerfile.is_empty() {
            query.push(("dockerfile", service.dockerfile.as_str()));
        }
        if !app.name.is_empty() {
            query.push(("cgroupparent", app.name.as_str()));
        }

        info!(service = %service.name, image = %service.image, "building image");
        let sent = self
            .client
            .post(self.url("/build"))
            .query(&query)
            .header(CONTENT_TYPE, "application/x-tar")
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await;
        archive.remove().await;

        let mut response =
            sent.map_err(|e| CloudmeError::stage(Stage::Build, &service.name, e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(Stage::Build, service, response).await);
        }

        let mut log = BuildLog::new(&service.name);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CloudmeError::stage(Stage::Build, &service.name, e.to_string()))?
        {
            log.feed(&chunk);
        }
        log.finish()
            .map_err(|message| CloudmeError::stage(Stage::Build, &service.name, message))
    }

    async fn run(
        &self,
        service: &MicroserviceDescriptor,
        app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError> {
        self.remove_container(Stage::Run, service).await?;

        let body = container_spec(service, app);
        let response = self
            .client
            .post(self.url("/containers/create"))
            .query(&[("name", service.name.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| CloudmeError::stage(Stage::Run, &service.name, e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(Stage::Run, service, response).await);
        }

        let response = self
            .client
            .post(self.url(&format!("/containers/{}/start", service.name)))
            .send()
            .await
            .map_err(|e| CloudmeError::stage(Stage::Run, &service.name, e.to_string()))?;
        // 304: already started
        if !(response.status().is_success() || response.status() == StatusCode::NOT_MODIFIED) {
            return Err(api_error(Stage::Run, service, response).await);
        }

        info!(service = %service.name, image = %service.image, "container started");
        Ok(())
    }

    async fn verify(
        &self,
        service: &MicroserviceDescriptor,
        app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError> {
        let url = health_url(service, app)
            .ok_or_else(|| CloudmeError::stage(Stage::Verify, &service.name, "no port to probe"))?;
        info!(service = %service.name, %url, timeout = ?self.probe.timeout(), "waiting for healthy answer");
        self.probe
            .wait_healthy(&url)
            .await
            .map_err(|message| CloudmeError::stage(Stage::Verify, &service.name, message))
    }

    async fn delete(
        &self,
        service: &MicroserviceDescriptor,
        _app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError> {
        self.remove_container(Stage::Delete, service).await
    }
}

/// `POST /containers/create` body.
fn container_spec(
    service: &MicroserviceDescriptor,
    app: &ApplicationDescriptor,
) -> serde_json::Value {
    let exposed: serde_json::Map<String, serde_json::Value> = app
        .ports
        .iter()
        .map(|p| (format!("{p}/tcp"), json!({})))
        .collect();
    let bindings: serde_json::Map<String, serde_json::Value> = app
        .ports
        .iter()
        .map(|p| (format!("{p}/tcp"), json!([{ "HostPort": p.to_string() }])))
        .collect();

    let mut spec = json!({
        "Image": service.image,
        "ExposedPorts": exposed,
        "Labels": {
            "cloudme.application": app.name,
            "cloudme.version": app.version,
        },
        "HostConfig": {
            "Binds": service.mounts,
            "PortBindings": bindings,
            "CgroupParent": app.name,
        },
    });
    if !service.hostname.is_empty() {
        spec["Hostname"] = json!(service.hostname);
    }
    if !service.command.is_empty() {
        spec["Cmd"] = json!(["/bin/sh", "-c", service.command]);
    }
    spec
}

fn health_url(service: &MicroserviceDescriptor, app: &ApplicationDescriptor) -> Option<String> {
    let port = app.ports.first()?;
    let host = if service.hostname.is_empty() {
        "127.0.0.1"
    } else {
        service.hostname.as_str()
    };
    Some(format!("http://{host}:{port}/"))
}

#[derive(Debug, Deserialize)]
struct DaemonMessage {
    message: String,
}

async fn api_error(
    stage: Stage,
    service: &MicroserviceDescriptor,
    response: reqwest::Response,
) -> CloudmeError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<DaemonMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);
    CloudmeError::stage(stage, &service.name, format!("daemon returned {status}: {message}"))
}

/// One JSON record of the build stream.
#[derive(Debug, Deserialize)]
struct BuildRecord {
    stream: Option<String>,
    error: Option<String>,
}

/// Accumulates the newline-delimited JSON build stream.
///
/// The daemon reports build failures inside a 200 response, so the stream
/// has to be read to the end before the build can be called a success.
struct BuildLog<'a> {
    service: &'a str,
    pending: Vec<u8>,
    error: Option<String>,
}

impl<'a> BuildLog<'a> {
    fn new(service: &'a str) -> Self {
        Self {
            service,
            pending: Vec::new(),
            error: None,
        }
    }

    fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.line(&line);
        }
    }

    fn line(&mut self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match serde_json::from_str::<BuildRecord>(text) {
            Ok(BuildRecord {
                error: Some(error), ..
            }) => {
                debug!(service = self.service, %error, "build error");
                self.error.get_or_insert(error);
            }
            Ok(BuildRecord {
                stream: Some(stream),
                ..
            }) => debug!(service = self.service, "{}", stream.trim_end()),
            _ => debug!(service = self.service, "{text}"),
        }
    }

    fn finish(mut self) -> Result<(), String> {
        let rest = std::mem::take(&mut self.pending);
        self.line(&rest);
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    use crate::domain::{Descriptor, FailureKind};
    use crate::pipeline::Coordinator;

    fn service() -> MicroserviceDescriptor {
        MicroserviceDescriptor {
            name: "api".into(),
            image: "shop/api".into(),
            hostname: "api.local".into(),
            mounts: vec!["/data:/data".into()],
            command: "./api --port 8080".into(),
            ..Default::default()
        }
    }

    fn app() -> ApplicationDescriptor {
        ApplicationDescriptor {
            name: "shop".into(),
            version: "1.2.0".into(),
            ports: vec![8080],
            ..Default::default()
        }
    }

    #[test]
    fn build_log_succeeds_without_error_records() {
        let mut log = BuildLog::new("api");
        log.feed(b"{\"stream\":\"Step 1/2 : FROM alpine\\n\"}\n{\"str");
        log.feed(b"eam\":\"Successfully built 123\\n\"}\n");
        assert!(log.finish().is_ok());
    }

    #[test]
    fn build_log_surfaces_error_record() {
        let mut log = BuildLog::new("api");
        log.feed(b"{\"stream\":\"Step 1/2 : FROM nope\\n\"}\n");
        log.feed(b"{\"errorDetail\":{\"message\":\"pull denied\"},\"error\":\"pull denied\"}");
        assert_eq!(log.finish().unwrap_err(), "pull denied");
    }

    #[test]
    fn container_spec_carries_service_settings() {
        let spec = container_spec(&service(), &app());
        assert_eq!(spec["Image"], "shop/api");
        assert_eq!(spec["Hostname"], "api.local");
        assert_eq!(spec["Cmd"][2], "./api --port 8080");
        assert_eq!(spec["HostConfig"]["Binds"][0], "/data:/data");
        assert_eq!(spec["HostConfig"]["CgroupParent"], "shop");
        assert_eq!(spec["HostConfig"]["PortBindings"]["8080/tcp"][0]["HostPort"], "8080");
        assert!(spec["ExposedPorts"].get("8080/tcp").is_some());
    }

    #[test]
    fn health_url_uses_hostname_and_first_port() {
        assert_eq!(
            health_url(&service(), &app()).as_deref(),
            Some("http://api.local:8080/")
        );

        let no_ports = ApplicationDescriptor::default();
        assert!(health_url(&service(), &no_ports).is_none());
    }

    #[test]
    fn connect_requires_host() {
        let err = DockerRuntime::connect(&DaemonConfig::default(), ".").err().unwrap();
        assert!(matches!(err, CloudmeError::RuntimeInit(_)));
    }

    #[test]
    fn connect_does_not_touch_the_daemon() {
        let daemon = DaemonConfig::new(Some("tcp://127.0.0.1:1".into()), false, None);
        let runtime = DockerRuntime::connect(&daemon, ".").unwrap();
        assert_eq!(runtime.name(), "docker");
        assert_eq!(runtime.url("/build"), "http://127.0.0.1:1/build");
    }

    // ---- loopback daemon ----

    /// One request as the daemon saw it.
    #[derive(Debug, Clone)]
    struct Request {
        method: String,
        path: String,
        query: Vec<(String, String)>,
        /// Lowercased request head.
        headers: String,
        body: Vec<u8>,
    }

    impl Request {
        fn param(&self, name: &str) -> Option<&str> {
            self.query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }

        fn route(&self) -> (&str, &str) {
            (self.method.as_str(), self.path.as_str())
        }
    }

    type Route = fn(&str, &str) -> (u16, &'static str);

    /// Answers every request from `route` and records it.
    async fn fake_daemon(route: Route) -> (DaemonConfig, Arc<Mutex<Vec<Request>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let Some(request) = read_request(&mut socket).await else {
                    continue;
                };
                let (status, body) = route(&request.method, &request.path);
                log.lock().await.push(request);
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        let daemon = DaemonConfig::new(Some(format!("tcp://{addr}")), false, None);
        (daemon, seen)
    }

    async fn read_more(socket: &mut TcpStream, buf: &mut Vec<u8>) -> Option<()> {
        let mut chunk = [0u8; 8192];
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        Some(())
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn dechunk(mut raw: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(pos) = find(raw, b"\r\n") {
            let size = usize::from_str_radix(String::from_utf8_lossy(&raw[..pos]).trim(), 16)
                .unwrap_or(0);
            if size == 0 {
                break;
            }
            let start = pos + 2;
            out.extend_from_slice(&raw[start..start + size]);
            raw = &raw[start + size + 2..];
        }
        out
    }

    async fn read_request(socket: &mut TcpStream) -> Option<Request> {
        let mut buf = Vec::new();
        let head_end = loop {
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
            read_more(socket, &mut buf).await?;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let headers = head.to_ascii_lowercase();

        let mut body = buf[head_end..].to_vec();
        if headers.contains("transfer-encoding: chunked") {
            while !(body.ends_with(b"\r\n0\r\n\r\n") || body == b"0\r\n\r\n") {
                read_more(socket, &mut body).await?;
            }
            body = dechunk(&body);
        } else {
            let len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while body.len() < len {
                read_more(socket, &mut body).await?;
            }
        }

        let mut first = head.lines().next()?.split_whitespace();
        let method = first.next()?.to_string();
        let url = reqwest::Url::parse(&format!("http://daemon{}", first.next()?)).ok()?;
        Some(Request {
            method,
            path: url.path().to_string(),
            query: url.query_pairs().into_owned().collect(),
            headers,
            body,
        })
    }

    fn context() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile.api"), b"FROM scratch\n").unwrap();
        dir
    }

    fn buildable() -> MicroserviceDescriptor {
        MicroserviceDescriptor {
            dockerfile: "Dockerfile.api".into(),
            ..service()
        }
    }

    fn stage_message(err: CloudmeError, expected: Stage) -> String {
        match err {
            CloudmeError::StageExecution { stage, message, .. } => {
                assert_eq!(stage, expected);
                message
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn build_ok(method: &str, path: &str) -> (u16, &'static str) {
        match (method, path) {
            ("POST", "/build") => (
                200,
                "{\"stream\":\"Step 1/1 : FROM scratch\\n\"}\n{\"stream\":\"Successfully tagged shop/api\\n\"}\n",
            ),
            _ => (404, "{\"message\":\"page not found\"}"),
        }
    }

    #[tokio::test]
    async fn build_posts_tar_context_with_parameters() {
        let (daemon, seen) = fake_daemon(build_ok).await;
        let dir = context();
        let runtime = DockerRuntime::connect(&daemon, dir.path()).unwrap();

        runtime.build(&buildable(), &app()).await.unwrap();

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        let build = &seen[0];
        assert_eq!(build.route(), ("POST", "/build"));
        assert_eq!(build.param("t"), Some("shop/api"));
        assert_eq!(build.param("dockerfile"), Some("Dockerfile.api"));
        assert_eq!(build.param("rm"), Some("true"));
        assert_eq!(build.param("q"), Some("false"));
        assert_eq!(build.param("cgroupparent"), Some("shop"));
        assert!(build.headers.contains("content-type: application/x-tar"));

        let mut archive = tar::Archive::new(build.body.as_slice());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Dockerfile.api"]);
    }

    #[tokio::test]
    async fn build_fails_on_error_record_in_ok_stream() {
        fn route(_: &str, _: &str) -> (u16, &'static str) {
            (
                200,
                "{\"stream\":\"Step 1/1 : FROM private/base\\n\"}\n{\"errorDetail\":{\"message\":\"pull access denied\"},\"error\":\"pull access denied\"}\n",
            )
        }
        let (daemon, _) = fake_daemon(route).await;
        let dir = context();
        let runtime = DockerRuntime::connect(&daemon, dir.path()).unwrap();

        let err = runtime.build(&buildable(), &app()).await.unwrap_err();
        assert!(stage_message(err, Stage::Build).contains("pull access denied"));
    }

    #[tokio::test]
    async fn build_api_error_becomes_stage_failure() {
        fn route(_: &str, _: &str) -> (u16, &'static str) {
            (500, "{\"message\":\"Cannot locate specified Dockerfile: Dockerfile.api\"}")
        }
        let (daemon, _) = fake_daemon(route).await;
        let dir = context();
        let runtime = DockerRuntime::connect(&daemon, dir.path()).unwrap();

        let err = runtime.build(&buildable(), &app()).await.unwrap_err();
        let message = stage_message(err, Stage::Build);
        assert!(message.contains("500"), "{message}");
        assert!(message.contains("Cannot locate specified Dockerfile"), "{message}");
    }

    #[tokio::test]
    async fn build_api_error_short_circuits_the_deploy() {
        fn route(_: &str, _: &str) -> (u16, &'static str) {
            (500, "{\"message\":\"no space left on device\"}")
        }
        let (daemon, seen) = fake_daemon(route).await;
        let dir = context();
        let runtime = DockerRuntime::connect(&daemon, dir.path()).unwrap();
        let descriptor = Descriptor::new(app(), vec![buildable()], dir.path()).unwrap();
        let coordinator = Coordinator::builder(Arc::new(runtime))
            .poll_interval(Duration::from_millis(10))
            .build()
            .unwrap();

        let report = coordinator
            .deploy_all(Arc::new(descriptor), CancellationToken::new())
            .await
            .unwrap();

        let api = report.service("api").unwrap();
        let kind = |stage| api.outcome(stage).unwrap().failure_detail().unwrap().kind;
        assert_eq!(kind(Stage::Build), FailureKind::StageExecution);
        assert_eq!(kind(Stage::Run), FailureKind::UpstreamFailed);
        assert_eq!(kind(Stage::Verify), FailureKind::UpstreamFailed);

        let routes: Vec<_> = seen
            .lock()
            .await
            .iter()
            .map(|r| (r.method.clone(), r.path.clone()))
            .collect();
        assert_eq!(routes, vec![("POST".to_string(), "/build".to_string())]);
    }

    fn run_ok(method: &str, path: &str) -> (u16, &'static str) {
        match (method, path) {
            ("DELETE", "/containers/api") => (404, "{\"message\":\"No such container: api\"}"),
            ("POST", "/containers/create") => (201, "{\"Id\":\"4fa6e0f0c678\",\"Warnings\":[]}"),
            ("POST", "/containers/api/start") => (204, ""),
            _ => (500, "{\"message\":\"unexpected request\"}"),
        }
    }

    #[tokio::test]
    async fn run_replaces_creates_then_starts() {
        let (daemon, seen) = fake_daemon(run_ok).await;
        let runtime = DockerRuntime::connect(&daemon, ".").unwrap();

        runtime.run(&service(), &app()).await.unwrap();

        let seen = seen.lock().await;
        let routes: Vec<_> = seen.iter().map(Request::route).collect();
        assert_eq!(
            routes,
            vec![
                ("DELETE", "/containers/api"),
                ("POST", "/containers/create"),
                ("POST", "/containers/api/start"),
            ]
        );
        assert_eq!(seen[0].param("force"), Some("true"));
        assert_eq!(seen[1].param("name"), Some("api"));

        let body: serde_json::Value = serde_json::from_slice(&seen[1].body).unwrap();
        assert_eq!(body["Image"], "shop/api");
        assert_eq!(body["HostConfig"]["CgroupParent"], "shop");
    }

    #[tokio::test]
    async fn run_stops_when_create_is_rejected() {
        fn route(method: &str, path: &str) -> (u16, &'static str) {
            match (method, path) {
                ("DELETE", _) => (204, ""),
                _ => (409, "{\"message\":\"Conflict. The container name \\\"/api\\\" is already in use\"}"),
            }
        }
        let (daemon, seen) = fake_daemon(route).await;
        let runtime = DockerRuntime::connect(&daemon, ".").unwrap();

        let err = runtime.run(&service(), &app()).await.unwrap_err();
        assert!(stage_message(err, Stage::Run).contains("409"));

        let seen = seen.lock().await;
        assert!(seen.iter().all(|r| !r.path.ends_with("/start")));
    }

    #[tokio::test]
    async fn delete_treats_missing_container_as_success() {
        fn route(_: &str, _: &str) -> (u16, &'static str) {
            (404, "{\"message\":\"No such container: api\"}")
        }
        let (daemon, seen) = fake_daemon(route).await;
        let runtime = DockerRuntime::connect(&daemon, ".").unwrap();

        runtime.delete(&service(), &app()).await.unwrap();

        let seen = seen.lock().await;
        assert_eq!(seen[0].route(), ("DELETE", "/containers/api"));
        assert_eq!(seen[0].param("force"), Some("true"));
    }

    #[tokio::test]
    async fn delete_surfaces_daemon_errors() {
        fn route(_: &str, _: &str) -> (u16, &'static str) {
            (500, "{\"message\":\"driver failed removing container\"}")
        }
        let (daemon, _) = fake_daemon(route).await;
        let runtime = DockerRuntime::connect(&daemon, ".").unwrap();

        let err = runtime.delete(&service(), &app()).await.unwrap_err();
        assert!(stage_message(err, Stage::Delete).contains("driver failed removing container"));
    }
}
