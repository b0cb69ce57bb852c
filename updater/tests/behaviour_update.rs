//! Behaviour-driven tests for the update orchestrator.
//!
//! The descriptor and archive are served by an in-memory fetcher so the
//! whole pipeline runs without a network. Relaunching is disabled.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use treepatch_updater::error::UpdateError;
use treepatch_updater::launcher::ProcessLauncher;
use treepatch_updater::orchestrator::{RunOptions, UpdateOutcome, run_with};
use treepatch_updater::patch::sha256_digest::Sha256Digest;
use treepatch_updater::test_utils::{StubFetcher, build_patch, write_tree};

const DESCRIPTOR_URL: &str = "https://updates.example.com/app/update.json";
const ARCHIVE_NAME: &str = "update_1.0.1.zip";
const ARCHIVE_URL: &str = "https://updates.example.com/app/update_1.0.1.zip";

// ---------------------------------------------------------------------------
// World types
// ---------------------------------------------------------------------------

struct UpdateWorld {
    temp_dir: TempDir,
    to_version: String,
    archive: Vec<u8>,
    archive_digest: Option<Sha256Digest>,
    recorded_digest: Option<Sha256Digest>,
    published: bool,
    requests: Vec<String>,
    result: Option<Result<UpdateOutcome, UpdateError>>,
}

#[fixture]
fn world() -> UpdateWorld {
    UpdateWorld {
        temp_dir: TempDir::new().expect("temp dir"),
        to_version: String::new(),
        archive: Vec::new(),
        archive_digest: None,
        recorded_digest: None,
        published: true,
        requests: Vec::new(),
        result: None,
    }
}

impl UpdateWorld {
    fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    fn installation(&self) -> PathBuf {
        self.path("install")
    }

    fn descriptor_json(&self) -> String {
        let mut descriptor = serde_json::json!({
            "from_version": "1.0.0",
            "to_version": self.to_version,
            "patch": ARCHIVE_NAME,
        });
        if let Some(digest) = &self.recorded_digest {
            descriptor["sha256"] = serde_json::Value::String(digest.as_str().to_owned());
        }
        descriptor.to_string()
    }

    fn run(&mut self, force: bool) {
        let mut fetcher = StubFetcher::new().with_response(DESCRIPTOR_URL, self.descriptor_json());
        if self.published {
            fetcher = fetcher.with_response(ARCHIVE_URL, self.archive.clone());
        }
        let options = RunOptions {
            force,
            launch: false,
            executable: Path::new("app"),
            backup_dir: None,
            download_timeout: Duration::from_secs(5),
            quiet: true,
        };
        let mut stderr = Vec::new();
        let result = run_with(
            DESCRIPTOR_URL,
            &self.installation(),
            &options,
            &fetcher,
            &ProcessLauncher,
            &mut stderr,
        );
        self.requests = fetcher.requests();
        self.result = Some(result);
    }

    fn update_error(&self) -> &UpdateError {
        match self.result.as_ref().expect("updater ran") {
            Ok(outcome) => panic!("update unexpectedly succeeded: {outcome:?}"),
            Err(err) => err,
        }
    }
}

fn build_files(version: &str) -> [(&str, String); 2] {
    [
        ("version.txt", version.to_owned()),
        ("bin/app", format!("app build {version}")),
    ]
}

fn write_build(root: &Path, version: &str) {
    let files = build_files(version);
    let pairs: Vec<(&str, &str)> = files
        .iter()
        .map(|(path, content)| (*path, content.as_str()))
        .collect();
    write_tree(root, &pairs).expect("write build");
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("an installation at version \"{version}\"")]
fn given_installation(world: &mut UpdateWorld, version: String) {
    write_build(&world.installation(), &version);
    write_build(&world.path("old"), &version);
}

#[given("a published patch to version \"{version}\"")]
fn given_published_patch(world: &mut UpdateWorld, version: String) {
    let new = world.path("new");
    write_build(&new, &version);
    let out = world.path("dist").join(ARCHIVE_NAME);
    let output = build_patch(Some(&world.path("old")), &new, &out, &version).expect("package");
    world.archive = fs::read(&output.archive_path).expect("read archive");
    world.archive_digest = Some(output.sha256);
    world.to_version = version;
}

#[given("the descriptor records the archive digest")]
fn given_digest_recorded(world: &mut UpdateWorld) {
    world.recorded_digest = world.archive_digest.clone();
}

#[given("the published archive has been tampered with")]
fn given_tampered(world: &mut UpdateWorld) {
    let last = world.archive.last_mut().expect("archive is not empty");
    *last ^= 0xff;
}

#[given("the archive is not published")]
fn given_unpublished(world: &mut UpdateWorld) {
    world.published = false;
}

#[when("the updater runs against the published descriptor")]
fn when_runs(world: &mut UpdateWorld) {
    world.run(false);
}

#[when("the updater runs against the published descriptor with force")]
fn when_runs_with_force(world: &mut UpdateWorld) {
    world.run(true);
}

#[then("the update succeeds")]
fn then_succeeds(world: &mut UpdateWorld) {
    match world.result.as_ref().expect("updater ran") {
        Ok(outcome) => assert_eq!(outcome.descriptor.to_version, world.to_version),
        Err(err) => panic!("update failed: {err}"),
    }
}

#[then("the installation is at version \"{version}\"")]
fn then_installed_version(world: &mut UpdateWorld, version: String) {
    let installed =
        fs::read_to_string(world.installation().join("version.txt")).expect("read version");
    assert_eq!(installed, version);
    let app = fs::read_to_string(world.installation().join("bin/app")).expect("read app");
    assert_eq!(app, format!("app build {version}"));
}

#[then("the archive was downloaded next to the descriptor")]
fn then_downloaded_relative(world: &mut UpdateWorld) {
    assert_eq!(world.requests, [DESCRIPTOR_URL, ARCHIVE_URL]);
}

#[then("the update fails its integrity check")]
fn then_integrity_fails(world: &mut UpdateWorld) {
    let err = world.update_error();
    assert!(
        matches!(err, UpdateError::Integrity { .. }),
        "unexpected error: {err}"
    );
}

#[then("the update fails with a network error")]
fn then_network_fails(world: &mut UpdateWorld) {
    let err = world.update_error();
    assert!(
        matches!(err, UpdateError::Network(_)),
        "unexpected error: {err}"
    );
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/update_orchestration.feature",
    name = "A remote update is downloaded, verified, and applied"
)]
fn scenario_remote_update(world: UpdateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/update_orchestration.feature",
    name = "A tampered archive is rejected before anything changes"
)]
fn scenario_tampered_archive(world: UpdateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/update_orchestration.feature",
    name = "A descriptor without a digest skips the integrity gate"
)]
fn scenario_no_digest(world: UpdateWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/update_orchestration.feature",
    name = "A missing archive is a network failure"
)]
fn scenario_missing_archive(world: UpdateWorld) {
    let _ = world;
}
