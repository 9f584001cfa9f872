use super::*;
use crate::foundation::core::BoundingBox;
use crate::geometry::mask::StrokeMask;
use crate::raster::block::PixelLayout;
use crate::registry::params::ParamMap;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "strokefx_runner_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn runner(name: &str) -> EffectRunner {
    let mut cfg = RunnerConfig::new(temp_dir(name));
    cfg.poll_interval = Duration::from_millis(5);
    EffectRunner::new(cfg)
}

/// 2x1 RGBA job.
fn job() -> Job {
    Job::new(
        JobId::generate(),
        BoundingBox::new(0, 0, 1, 0).unwrap(),
        ImageBlock::filled(2, 1, PixelLayout::Rgba, &[7, 7, 7, 255]).unwrap(),
        StrokeMask::from_bits(2, 1, vec![true, false]).unwrap(),
        vec![],
        ParamMap::new(),
        false,
    )
    .unwrap()
}

/// `sh -c <script>` with the job id as `$1`.
fn shell(id: &str, script: &str) -> EffectDescriptor {
    EffectDescriptor {
        id: id.to_owned(),
        name: id.to_owned(),
        requirements: Vec::new(),
        launcher: EffectLauncher::Command {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_owned(), script.to_owned(), id.to_owned()],
        },
        writes_alpha: false,
    }
}

const TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn cancel_token_is_shared_between_clones() {
    let a = CancelToken::new();
    let b = a.clone();
    assert!(!b.is_cancelled());
    a.cancel();
    assert!(b.is_cancelled());
}

#[cfg(unix)]
#[test]
fn well_behaved_effect_returns_its_block_and_cleans_up() {
    let r = runner("ok");
    let job = job();
    let fx = shell(
        "ok",
        r#"test -f "$STROKEFX_JOB_DIR/job_$1.json" || exit 3
printf '{"image":[[[1,2,3],[4,5,6]]]}' > "$STROKEFX_JOB_DIR/result_$1.json""#,
    );

    let out = r.run_effect(&fx, &job, TIMEOUT).unwrap();
    assert_eq!(out.shape(), (2, 1, 3));
    assert_eq!(out.data(), &[1, 2, 3, 4, 5, 6]);
    assert!(!r.config().paths.job_file(job.id()).exists());
    assert!(!r.config().paths.result_file(job.id()).exists());

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}

#[cfg(unix)]
#[test]
fn nonzero_exit_reports_code_and_stderr() {
    let r = runner("exit");
    let job = job();
    let fx = shell("boom", "echo 'bad pixels' >&2; exit 1");

    let f = r.run_effect(&fx, &job, TIMEOUT).unwrap_err();
    assert_eq!(f.kind, FailureKind::ExitStatus);
    assert_eq!(f.exit_code, Some(1));
    assert_eq!(f.effect_id, "boom");
    assert_eq!(f.job_id, job.id());
    assert!(f.diagnostic.contains("bad pixels"), "{}", f.diagnostic);

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}

#[cfg(unix)]
#[test]
fn silent_success_is_missing_output() {
    let r = runner("silent");
    let f = r.run_effect(&shell("quiet", "exit 0"), &job(), TIMEOUT).unwrap_err();
    assert_eq!(f.kind, FailureKind::MissingOutput);
    assert_eq!(f.exit_code, Some(0));

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}

#[cfg(unix)]
#[test]
fn wrong_sized_result_is_shape_mismatch() {
    let r = runner("shape");
    let fx = shell(
        "small",
        r#"printf '{"image":[[[1,2,3]]]}' > "$STROKEFX_JOB_DIR/result_$1.json""#,
    );
    let f = r.run_effect(&fx, &job(), TIMEOUT).unwrap_err();
    assert_eq!(f.kind, FailureKind::ShapeMismatch);

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}

#[cfg(unix)]
#[test]
fn garbage_result_is_decode_failure() {
    let r = runner("garbage");
    let fx = shell("junk", r#"echo 'not json' > "$STROKEFX_JOB_DIR/result_$1.json""#);
    let f = r.run_effect(&fx, &job(), TIMEOUT).unwrap_err();
    assert_eq!(f.kind, FailureKind::Decode);

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}

#[cfg(unix)]
#[test]
fn slow_effect_is_killed_at_timeout() {
    let r = runner("timeout");
    let started = Instant::now();
    let f = r
        .run_effect(&shell("slow", "exec sleep 30"), &job(), Duration::from_millis(200))
        .unwrap_err();
    assert_eq!(f.kind, FailureKind::Timeout);
    assert_eq!(f.exit_code, None);
    assert!(started.elapsed() < Duration::from_secs(10));

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}

#[cfg(unix)]
#[test]
fn cancel_kills_running_effect() {
    let r = runner("cancel");
    let cancel = CancelToken::new();
    let remote = cancel.clone();
    let t = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        remote.cancel();
    });

    let started = Instant::now();
    let f = r
        .run_effect_cancellable(&shell("slow", "exec sleep 30"), &job(), TIMEOUT, &cancel)
        .unwrap_err();
    t.join().unwrap();
    assert_eq!(f.kind, FailureKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(10));

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}

#[test]
fn unknown_program_is_spawn_failure() {
    let r = runner("spawn");
    let fx = EffectDescriptor {
        id: "ghost".to_owned(),
        name: "Ghost".to_owned(),
        requirements: Vec::new(),
        launcher: EffectLauncher::Command {
            program: PathBuf::from("/definitely/not/a/strokefx/effect"),
            args: Vec::new(),
        },
        writes_alpha: false,
    };
    let job = job();
    let f = r.run_effect(&fx, &job, TIMEOUT).unwrap_err();
    assert_eq!(f.kind, FailureKind::Spawn);
    assert!(!r.config().paths.job_file(job.id()).exists());

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}

#[cfg(unix)]
#[test]
fn keep_artifacts_leaves_job_file() {
    let mut cfg = RunnerConfig::new(temp_dir("keep"));
    cfg.keep_artifacts = true;
    let r = EffectRunner::new(cfg);
    let job = job();
    let _ = r.run_effect(&shell("quiet", "exit 0"), &job, TIMEOUT);
    assert!(r.config().paths.job_file(job.id()).exists());

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}

#[test]
fn diagnostics_are_trimmed_tails() {
    let long = vec![b'x'; DIAGNOSTIC_TAIL + 100];
    assert_eq!(tail_lossy(&long).len(), DIAGNOSTIC_TAIL);
    assert_eq!(tail_lossy(b"  hi \n"), "hi");
    assert_eq!(join_diagnostic("exit status 1", ""), "exit status 1");
    assert_eq!(join_diagnostic("exit status 1", "oops"), "exit status 1: oops");
}

#[test]
fn output_tail_is_bounded_while_reading() {
    let mut chatty = std::io::Read::chain(
        std::io::Read::take(std::io::repeat(b'x'), 1 << 20),
        &b"last words"[..],
    );
    let kept = read_tail(&mut chatty, 16);
    assert_eq!(kept, b"xxxxxxlast words");

    let mut short = &b"brief"[..];
    assert_eq!(read_tail(&mut short, DIAGNOSTIC_TAIL), b"brief");
}

#[cfg(unix)]
#[test]
fn chatty_failure_reports_only_the_tail() {
    let r = runner("chatty");
    let script = "head -c 3000000 /dev/zero | tr '\\0' 'y' >&2; echo final >&2; exit 3";
    let err = r
        .run_effect(&shell("chatty", script), &job(), TIMEOUT)
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::ExitStatus);
    assert!(err.diagnostic.ends_with("final"));
    assert!(err.diagnostic.len() < DIAGNOSTIC_TAIL + 64);

    let _ = std::fs::remove_dir_all(r.config().paths.dir());
}
