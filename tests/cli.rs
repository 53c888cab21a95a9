use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            cmd.env_remove("WEAVIATE_URL").env_remove("WEAVIATE_API_KEY");
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

#[rstest]
#[case::setup("setup")]
#[case::register("register")]
#[case::extract("extract")]
#[case::stats("stats")]
#[case::server("server")]
fn help_lists_subcommand(#[case] subcmd: &str) -> Result<()> {
    cargo_run!("facereg", "--help").success().stdout(predicate::str::contains(subcmd));
    Ok(())
}

#[test]
fn register_requires_people() -> Result<()> {
    cargo_run!("facereg", "register", "--dry-run")
        .failure()
        .stderr(predicate::str::contains("没有指定要注册的人员"));
    Ok(())
}

#[test]
fn register_rejects_malformed_person() -> Result<()> {
    cargo_run!("facereg", "register", "--person", "nobody")
        .failure()
        .stderr(predicate::str::contains("NAME=DIR"));
    Ok(())
}

#[test]
fn stats_reports_unreachable_store() -> Result<()> {
    cargo_run!("facereg", "stats", "--weaviate-url", "http://127.0.0.1:9", "--request-timeout", "5")
        .failure()
        .stderr(predicate::str::contains("--weaviate-url"))
        .stderr(predicate::str::contains("无法访问向量数据库"));
    Ok(())
}

#[test]
fn extract_reports_missing_image() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    cargo_run!("facereg", "extract", dir.path().join("missing.jpg"))
        .failure()
        .stderr(predicate::str::contains("无法读取图片"));
    Ok(())
}
