use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vigilant_flash::{
    ConfigurationError, Error, FlashRequest, Invocation, Pipeline, RecordingRunner, Stage,
    Target, ToolchainLocator, DEFAULT_BAUD,
};

struct Fixture {
    sdk: TempDir,
    repo: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let sdk = tempfile::tempdir().unwrap();
        fs::create_dir_all(sdk.path().join("tools")).unwrap();
        fs::create_dir_all(sdk.path().join("components/partition_table")).unwrap();
        fs::write(sdk.path().join("tools/idf.py"), "").unwrap();
        fs::write(
            sdk.path().join("components/partition_table/parttool.py"),
            "",
        )
        .unwrap();

        Self {
            sdk,
            repo: tempfile::tempdir().unwrap(),
        }
    }

    fn with_artifact(self, target: Target) -> Self {
        let artifact = target.artifact_path(self.repo.path());
        fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        fs::write(artifact, [0xe9_u8, 0x03, 0x02, 0x20]).unwrap();
        self
    }

    fn locator(&self) -> ToolchainLocator<HashMap<String, String>> {
        let mut source = HashMap::new();
        source.insert(
            "IDF_PATH".to_string(),
            self.sdk.path().to_string_lossy().into_owned(),
        );
        ToolchainLocator::new(source)
    }

    fn pipeline(
        &self,
        runner: RecordingRunner,
    ) -> Pipeline<RecordingRunner, HashMap<String, String>> {
        Pipeline::new(runner, self.locator(), self.repo.path())
    }

    fn parttool(&self) -> PathBuf {
        self.sdk
            .path()
            .join("components")
            .join("partition_table")
            .join("parttool.py")
    }

    fn idf_py(&self) -> PathBuf {
        self.sdk.path().join("tools").join("idf.py")
    }
}

fn args(invocation: &Invocation) -> Vec<String> {
    invocation
        .arguments()
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

fn is_invocation_of(invocation: &Invocation, tool: &Path) -> bool {
    invocation.arguments().first().map(Path::new) == Some(tool)
}

fn option_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[test]
fn main_without_build_writes_ota_0_only() {
    let fixture = Fixture::new().with_artifact(Target::Main);
    let mut pipeline = fixture.pipeline(RecordingRunner::new());

    pipeline
        .run(&FlashRequest::new(Target::Main, "/dev/ttyACM0").skip_build(true))
        .unwrap();

    let invocations = pipeline.runner().invocations();
    assert_eq!(invocations.len(), 1);
    assert!(is_invocation_of(&invocations[0], &fixture.parttool()));

    let binary = fixture
        .repo
        .path()
        .join("build")
        .join("vigilant-engine.bin");
    assert_eq!(
        args(&invocations[0])[1..].to_vec(),
        vec![
            "--port".to_string(),
            "/dev/ttyACM0".to_string(),
            "--baud".to_string(),
            "921600".to_string(),
            "write_partition".to_string(),
            "--partition-name".to_string(),
            "ota_0".to_string(),
            "--input".to_string(),
            binary.to_string_lossy().into_owned(),
        ]
    );
    assert_eq!(pipeline.stage(), &Stage::Done);
}

#[test]
fn recovery_uses_its_own_project_and_partition() {
    let fixture = Fixture::new().with_artifact(Target::Recovery);
    let mut pipeline = fixture.pipeline(RecordingRunner::new());

    pipeline
        .run(&FlashRequest::new(Target::Recovery, "COM7"))
        .unwrap();

    let invocations = pipeline.runner().invocations();
    assert_eq!(invocations.len(), 2);

    let project = fixture.repo.path().join("vigilant-engine-recovery");
    let build = &invocations[0];
    assert_eq!(
        option_value(&args(build), "-C").map(PathBuf::from),
        Some(project.clone())
    );
    assert_eq!(build.working_dir(), Some(project.as_path()));

    let write = args(&invocations[1]);
    assert_eq!(option_value(&write, "--partition-name"), Some("factory"));
    assert_eq!(
        option_value(&write, "--input").map(PathBuf::from),
        Some(Target::Recovery.artifact_path(fixture.repo.path()))
    );
}

#[test]
fn missing_sdk_root_spawns_nothing() {
    let fixture = Fixture::new().with_artifact(Target::Main);
    let mut pipeline = Pipeline::new(
        RecordingRunner::new(),
        ToolchainLocator::new(HashMap::new()),
        fixture.repo.path(),
    );

    let err = pipeline
        .run(&FlashRequest::new(Target::Main, "/dev/ttyACM0"))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::MissingSdkRoot)
    ));
    assert_eq!(err.exit_code(), 1);
    assert!(pipeline.runner().invocations().is_empty());
}

#[test]
fn build_reconfigures_then_builds_before_writing() {
    let fixture = Fixture::new().with_artifact(Target::Main);
    let mut pipeline = fixture.pipeline(RecordingRunner::new());

    pipeline
        .run(&FlashRequest::new(Target::Main, "/dev/ttyACM0"))
        .unwrap();

    let invocations = pipeline.runner().invocations();
    assert_eq!(invocations.len(), 2);
    assert!(is_invocation_of(&invocations[0], &fixture.idf_py()));
    assert!(is_invocation_of(&invocations[1], &fixture.parttool()));

    let build = args(&invocations[0]);
    assert_eq!(
        build[1..].to_vec(),
        vec![
            "-C".to_string(),
            fixture.repo.path().to_string_lossy().into_owned(),
            "reconfigure".to_string(),
            "build".to_string(),
        ]
    );
    assert_eq!(invocations[0].working_dir(), Some(fixture.repo.path()));
}

#[test]
fn missing_artifact_never_reaches_the_write_tool() {
    let fixture = Fixture::new();
    let mut pipeline = fixture.pipeline(RecordingRunner::new());

    let err = pipeline
        .run(&FlashRequest::new(Target::Main, "/dev/ttyACM0").skip_build(true))
        .unwrap_err();

    match err {
        Error::MissingArtifact { ref path } => {
            assert_eq!(path, &Target::Main.artifact_path(fixture.repo.path()))
        }
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), 1);
    assert!(pipeline.runner().invocations().is_empty());
    assert!(matches!(pipeline.stage(), Stage::Failed { .. }));
}

#[test]
fn missing_artifact_after_build_is_reported() {
    let fixture = Fixture::new();
    let mut pipeline = fixture.pipeline(RecordingRunner::new());

    let err = pipeline
        .run(&FlashRequest::new(Target::Recovery, "/dev/ttyACM0"))
        .unwrap_err();

    assert!(matches!(err, Error::MissingArtifact { .. }));
    let invocations = pipeline.runner().invocations();
    assert_eq!(invocations.len(), 1);
    assert!(is_invocation_of(&invocations[0], &fixture.idf_py()));
}

#[test]
fn baud_is_passed_through() {
    let fixture = Fixture::new().with_artifact(Target::Main);

    let mut pipeline = fixture.pipeline(RecordingRunner::new());
    let request = FlashRequest::new(Target::Main, "/dev/ttyACM0").skip_build(true);
    assert_eq!(request.baud, DEFAULT_BAUD);
    pipeline.run(&request).unwrap();
    let write = args(&pipeline.runner().invocations()[0]);
    assert_eq!(option_value(&write, "--baud"), Some("921600"));

    let mut pipeline = fixture.pipeline(RecordingRunner::new());
    pipeline.run(&request.clone().with_baud(115_200)).unwrap();
    let write = args(&pipeline.runner().invocations()[0]);
    assert_eq!(option_value(&write, "--baud"), Some("115200"));
}

#[test]
fn failed_build_skips_the_write() {
    let fixture = Fixture::new().with_artifact(Target::Main);
    let mut pipeline = fixture.pipeline(RecordingRunner::with_exit_codes([2]));

    let err = pipeline
        .run(&FlashRequest::new(Target::Main, "/dev/ttyACM0"))
        .unwrap_err();

    assert!(matches!(err, Error::ExternalToolFailure { code: 2 }));
    assert_eq!(err.exit_code(), 2);

    let invocations = pipeline.runner().invocations();
    assert_eq!(invocations.len(), 1);
    assert!(is_invocation_of(&invocations[0], &fixture.idf_py()));
}

#[test]
fn failed_write_reports_the_tool_exit_code() {
    let fixture = Fixture::new().with_artifact(Target::Main);
    let mut pipeline = fixture.pipeline(RecordingRunner::with_exit_codes([0, 1]));

    let err = pipeline
        .run(&FlashRequest::new(Target::Main, "/dev/ttyACM0"))
        .unwrap_err();

    assert!(matches!(err, Error::ExternalToolFailure { code: 1 }));
    assert_eq!(pipeline.runner().invocations().len(), 2);
}

#[test]
fn busy_port_is_rejected_before_building() {
    let fixture = Fixture::new().with_artifact(Target::Main);
    let locks = tempfile::tempdir().unwrap();
    let _held = vigilant_flash::lock::PortLock::acquire(locks.path(), "/dev/ttyACM0").unwrap();

    let mut pipeline = fixture
        .pipeline(RecordingRunner::new())
        .with_port_lock_dir(Some(locks.path().to_path_buf()));

    let err = pipeline
        .run(&FlashRequest::new(Target::Main, "/dev/ttyACM0"))
        .unwrap_err();

    assert!(matches!(err, Error::PortBusy { .. }));
    assert!(pipeline.runner().invocations().is_empty());
}

#[test]
fn port_lock_is_released_after_the_run() {
    let fixture = Fixture::new().with_artifact(Target::Main);
    let locks = tempfile::tempdir().unwrap();

    let mut pipeline = fixture
        .pipeline(RecordingRunner::new())
        .with_port_lock_dir(Some(locks.path().to_path_buf()));
    let request = FlashRequest::new(Target::Main, "/dev/ttyACM0").skip_build(true);

    pipeline.run(&request).unwrap();
    pipeline.run(&request).unwrap();

    vigilant_flash::lock::PortLock::acquire(locks.path(), "/dev/ttyACM0").unwrap();
}

#[test]
fn relative_repo_root_is_resolved_before_running_tools() {
    let fixture = Fixture::new();
    let repo = tempfile::tempdir_in(".").unwrap();
    let relative = Path::new(".").join(repo.path().file_name().unwrap());
    let artifact = Target::Recovery.artifact_path(&relative);
    fs::create_dir_all(artifact.parent().unwrap()).unwrap();
    fs::write(&artifact, b"image").unwrap();

    let mut pipeline = Pipeline::new(RecordingRunner::new(), fixture.locator(), &relative);
    pipeline
        .run(&FlashRequest::new(Target::Recovery, "/dev/ttyACM0"))
        .unwrap();

    let root = std::path::absolute(&relative).unwrap();
    let project = root.join("vigilant-engine-recovery");
    let invocations = pipeline.runner().invocations();

    let build = &invocations[0];
    let project_arg = option_value(&args(build), "-C").map(PathBuf::from).unwrap();
    assert!(project_arg.is_absolute());
    assert_eq!(project_arg, project);
    assert_eq!(build.working_dir(), Some(project.as_path()));

    let input = option_value(&args(&invocations[1]), "--input")
        .map(PathBuf::from)
        .unwrap();
    assert!(input.is_absolute());
    assert_eq!(input, Target::Recovery.artifact_path(&root));
}
