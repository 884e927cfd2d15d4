use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use bytes::Bytes;
use futures::StreamExt;
use monoform::{
    config::{ExtractorConfig, ExtractorKind},
    container::{ArchiveStream, ContainerRuntime, ImageConfig},
    extract::{self, default_extractor, CmdExtractor, FileExtractor, ProcfileExtractor},
    formation::{Command, Exposure, Process, Protocol},
    oci::Reference,
    App, ErrorKind, ExposurePolicy, MonoformError, MonoformResult, ProcfileError,
};
use tokio_util::sync::CancellationToken;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An in-memory container runtime that records how often each operation is called.
#[derive(Default)]
struct MockRuntime {
    config: ImageConfig,
    archives: HashMap<String, Vec<u8>>,
    fail_create: bool,
    fail_copy: bool,
    fail_remove: bool,
    hang_copy: bool,
    endless_copy: bool,
    cancel_on_create: Option<CancellationToken>,
    inspect_calls: AtomicUsize,
    create_calls: AtomicUsize,
    copy_calls: AtomicUsize,
    remove_calls: AtomicUsize,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MockRuntime {
    fn new(cmd: &[&str], working_dir: &str) -> Self {
        Self {
            config: ImageConfig::builder()
                .cmd(cmd.iter().map(|s| s.to_string()).collect::<Vec<_>>())
                .working_dir(working_dir)
                .build(),
            ..Default::default()
        }
    }

    fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        self.archives.insert(path.to_string(), archive(contents));
        self
    }

    fn with_archive(mut self, path: &str, raw: &[u8]) -> Self {
        self.archives.insert(path.to_string(), raw.to_vec());
        self
    }

    fn removes(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl ContainerRuntime for MockRuntime {
    async fn inspect_image(&self, _image: &Reference) -> MonoformResult<ImageConfig> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.config.clone())
    }

    async fn create_container(&self, _image: &Reference) -> MonoformResult<String> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(MonoformError::runtime(anyhow::anyhow!("no space left on device")));
        }

        // The container exists by the time the caller gives up on it.
        if let Some(cancel) = &self.cancel_on_create {
            cancel.cancel();
            tokio::task::yield_now().await;
        }

        Ok(format!("container-{n}"))
    }

    async fn remove_container(&self, _container_id: &str) -> MonoformResult<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove {
            return Err(MonoformError::runtime(anyhow::anyhow!("container is busy")));
        }

        Ok(())
    }

    async fn copy_from_container(
        &self,
        _container_id: &str,
        path: &str,
    ) -> MonoformResult<ArchiveStream> {
        self.copy_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_copy {
            return Err(MonoformError::runtime(anyhow::anyhow!("connection reset")));
        }

        if self.hang_copy {
            return Ok(futures::stream::pending().boxed());
        }

        match self.archives.get(path) {
            Some(raw) => {
                let chunks: Vec<MonoformResult<Bytes>> = raw
                    .chunks(100)
                    .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                    .collect();
                let stream = futures::stream::iter(chunks);
                if self.endless_copy {
                    return Ok(stream.chain(futures::stream::pending()).boxed());
                }

                Ok(stream.boxed())
            }
            None => Err(ProcfileError::NotFound(path.to_string()).into()),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn archive(contents: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "Procfile", contents)
        .unwrap();
    builder.into_inner().unwrap()
}

fn image() -> Reference {
    "acme/api:1.0".parse().unwrap()
}

fn cmd(args: &[&str]) -> Command {
    Command::from_args(args.iter().copied()).unwrap()
}

async fn derive(runtime: &Arc<MockRuntime>, app: &App) -> MonoformResult<monoform::formation::Formation> {
    let extractor = default_extractor(runtime.clone());
    extract::extract_formation(&extractor, &image(), app, &CancellationToken::new()).await
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test)]
async fn test_extraction_standard_procfile_from_working_dir() -> anyhow::Result<()> {
    let runtime = Arc::new(
        MockRuntime::new(&["./server"], "/app")
            .with_file("/app/Procfile", b"web: rackup\nworker: rake jobs:work\n"),
    );
    let app = App::builder().exposure(ExposurePolicy::Public).build();

    let formation = derive(&runtime, &app).await?;

    assert_eq!(formation.len(), 2);
    assert_eq!(
        formation.get("web"),
        Some(&Process::new(
            cmd(&["rackup"]),
            Some(Exposure::new(true, Protocol::Http, None))
        ))
    );
    assert_eq!(
        formation.get("worker"),
        Some(&Process::new(cmd(&["rake", "jobs:work"]), None))
    );
    assert_eq!(runtime.creates(), 1);
    assert_eq!(runtime.removes(), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_extended_procfile_takes_cert_from_app() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime::new(&[], "").with_file(
        "/Procfile",
        br#"{"web": {"command": "./app", "expose": {"external": true, "protocol": "https"}}}"#,
    ));
    let app = App::builder().cert("cert-1").build();

    let formation = derive(&runtime, &app).await?;

    assert_eq!(
        formation.get("web"),
        Some(&Process::new(
            cmd(&["./app"]),
            Some(Exposure::new(true, Protocol::Https, Some("cert-1".into())))
        ))
    );

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_falls_back_to_default_command() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime::new(&["nginx", "-g", "daemon off;"], "/usr/share"));
    let app = App::builder()
        .exposure(ExposurePolicy::Public)
        .cert("cert-1")
        .build();

    let formation = derive(&runtime, &app).await?;

    assert_eq!(formation.len(), 1);
    assert_eq!(
        formation.get("web"),
        Some(&Process::new(cmd(&["nginx", "-g", "daemon off;"]), None))
    );
    assert_eq!(runtime.removes(), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_no_extractor_applicable() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime::new(&[], "/app"));

    let err = derive(&runtime, &App::default()).await.unwrap_err();

    assert!(matches!(err, MonoformError::NoExtractorApplicable));
    assert_eq!(runtime.removes(), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_copy_failure_aborts_chain() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime {
        fail_copy: true,
        ..MockRuntime::new(&["./server"], "/app")
    });

    let err = derive(&runtime, &App::default()).await.unwrap_err();

    assert!(matches!(err, MonoformError::Runtime(_)));
    assert_eq!(err.kind(), ErrorKind::Infrastructure);
    assert_eq!(runtime.removes(), 1);
    // The default command strategy would have inspected the image a second time.
    assert_eq!(runtime.inspect_calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_create_failure_is_fatal_and_nothing_to_release() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime {
        fail_create: true,
        ..MockRuntime::new(&["./server"], "/app")
    });

    let err = derive(&runtime, &App::default()).await.unwrap_err();

    assert!(matches!(err, MonoformError::Runtime(_)));
    assert_eq!(runtime.copy_calls.load(Ordering::SeqCst), 0);
    assert_eq!(runtime.removes(), 0);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_undecodable_archive_is_not_applicable() -> anyhow::Result<()> {
    let runtime = Arc::new(
        MockRuntime::new(&["./server"], "/app").with_archive("/app/Procfile", &[0xff; 100]),
    );

    let file = FileExtractor::with_procfile_name(runtime.clone(), "Procfile");
    let err = file
        .extract(&image(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotApplicable);
    assert_eq!(runtime.removes(), 1);

    // The chain falls back to the default command.
    let formation = derive(&runtime, &App::default()).await?;
    assert_eq!(formation.get("web").unwrap().get_command(), &cmd(&["./server"]));
    assert_eq!(runtime.removes(), 2);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_release_failure_does_not_mask_outcome() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime {
        fail_remove: true,
        ..MockRuntime::new(&[], "").with_file("/Procfile", b"web: ./server\n")
    });
    let formation = derive(&runtime, &App::default()).await?;
    assert_eq!(formation.len(), 1);
    assert_eq!(runtime.removes(), 1);

    let runtime = Arc::new(MockRuntime {
        fail_remove: true,
        fail_copy: true,
        ..MockRuntime::new(&[], "")
    });
    let err = derive(&runtime, &App::default()).await.unwrap_err();
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(runtime.removes(), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_cancelled_copy_still_releases() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime {
        hang_copy: true,
        ..MockRuntime::new(&["./server"], "/app")
    });
    let extractor = default_extractor(runtime.clone());
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        })
    };

    let err = extract::extract_formation(&extractor, &image(), &App::default(), &cancel)
        .await
        .unwrap_err();
    canceller.await?;

    assert!(matches!(err, MonoformError::Cancelled));
    assert_eq!(runtime.removes(), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_cancelled_during_create_still_releases() -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let runtime = Arc::new(MockRuntime {
        cancel_on_create: Some(cancel.clone()),
        ..MockRuntime::new(&["./server"], "/app").with_file("/app/Procfile", b"web: ./server\n")
    });
    let extractor = default_extractor(runtime.clone());

    let err = extract::extract_formation(&extractor, &image(), &App::default(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, MonoformError::Cancelled));
    assert_eq!(runtime.creates(), 1);
    assert_eq!(runtime.removes(), 1);
    assert_eq!(runtime.copy_calls.load(Ordering::SeqCst), 0);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_cancelled_before_create_creates_nothing() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime::new(&["./server"], "/app"));
    let extractor = default_extractor(runtime.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = extract::extract_formation(&extractor, &image(), &App::default(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, MonoformError::Cancelled));
    assert_eq!(runtime.creates(), 0);
    assert_eq!(runtime.removes(), 0);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_ignores_archive_after_first_entry() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime {
        endless_copy: true,
        ..MockRuntime::new(&[], "/app").with_file("/app/Procfile", b"web: ./server\n")
    });

    let formation = tokio::time::timeout(Duration::from_secs(5), derive(&runtime, &App::default()))
        .await??;
    assert_eq!(formation.get("web").unwrap().get_command(), &cmd(&["./server"]));
    assert_eq!(runtime.removes(), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_dropped_future_still_releases() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime {
        hang_copy: true,
        ..MockRuntime::new(&["./server"], "/app")
    });
    let extractor = default_extractor(runtime.clone());
    let cancel = CancellationToken::new();

    let result = tokio::time::timeout(
        Duration::from_millis(20),
        extract::extract_formation(&extractor, &image(), &App::default(), &cancel),
    )
    .await;
    assert!(result.is_err());

    // Removal is spawned when the lease is dropped.
    for _ in 0..50 {
        if runtime.removes() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(runtime.removes(), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_unknown_format_is_not_applicable_in_chain() -> anyhow::Result<()> {
    let runtime = Arc::new(
        MockRuntime::new(&["./server"], "").with_file("/Procfile", b"- web\n- worker\n"),
    );

    let err = derive(&runtime, &App::default()).await.unwrap_err();

    assert!(matches!(
        err,
        MonoformError::Procfile(ProcfileError::UnknownFormat)
    ));
    assert_eq!(err.kind(), ErrorKind::NotApplicable);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_malformed_entry_names_process() -> anyhow::Result<()> {
    let runtime = Arc::new(
        MockRuntime::new(&["./server"], "")
            .with_file("/Procfile", b"worker:\n  command: [python, 42]\n"),
    );

    let err = derive(&runtime, &App::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert!(err.to_string().contains("`worker`"));

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_cmd_extractor_needs_no_container() -> anyhow::Result<()> {
    let runtime = Arc::new(MockRuntime::new(&["python", "app.py"], "/srv"));
    let extractor = CmdExtractor::new(runtime.clone());

    let formation = extract::extract_formation(
        &extractor,
        &image(),
        &App::default(),
        &CancellationToken::new(),
    )
    .await?;

    assert_eq!(formation.get("web").unwrap().get_command(), &cmd(&["python", "app.py"]));
    assert_eq!(runtime.creates(), 0);

    let runtime = Arc::new(MockRuntime::new(&[], "/srv"));
    let err = CmdExtractor::new(runtime)
        .extract(&image(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MonoformError::Procfile(ProcfileError::NoDefaultCommand)
    ));

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_extraction_configured_chain() -> anyhow::Result<()> {
    let runtime = Arc::new(
        MockRuntime::new(&["./server"], "/app")
            .with_file("/app/Procfile.web", b"web: bin/web\n"),
    );

    let config = ExtractorConfig::from_toml_str(
        r#"
        procfile_name = "Procfile.web"
        extractors = ["file"]
        "#,
    )?;
    let extractor = config.build_extractor(runtime.clone())?;
    assert_eq!(extractor.len(), 1);

    let formation =
        extract::extract_formation(&extractor, &image(), &App::default(), &CancellationToken::new())
            .await?;
    assert_eq!(formation.get("web").unwrap().get_command(), &cmd(&["bin/web"]));

    let only_cmd = ExtractorConfig::builder()
        .extractors(vec![ExtractorKind::Cmd])
        .build()
        .build_extractor(runtime.clone())?;
    let formation =
        extract::extract_formation(&only_cmd, &image(), &App::default(), &CancellationToken::new())
            .await?;
    assert_eq!(formation.get("web").unwrap().get_command(), &cmd(&["./server"]));

    Ok(())
}
