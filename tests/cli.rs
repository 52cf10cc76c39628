#![cfg(unix)]

// End-to-end behavior of the `example-docs` binary against throwaway trees.
mod support;

use anyhow::Result;
use serde_json::Value;
use std::fs;
use support::{
    ExampleTree, assert_exit, examples_command, git_available, run_command, stderr, stdout,
};

#[test]
fn list_marks_deployable_examples() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example("flows/deploy_me.py", "true", "# deploy: true\n")?;
    tree.write("flows/plain.py", "print('hi')\n")?;

    let output = tree.run(&["list"])?;
    assert_exit(&output, 0)?;
    assert_eq!(
        stdout(&output),
        "Found 2 examples:\n[deploy] flows/deploy_me.py\n[ -    ] flows/plain.py\n"
    );
    Ok(())
}

#[test]
fn list_json_exports_flat_entries() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/plain.py", "# ---\n# title: Plain\n# ---\nprint('hi')\n")?;
    tree.write("flows/diagram.png", "png")?;

    let output = tree.run(&["list", "--json"])?;
    assert_exit(&output, 0)?;
    let parsed: Value = serde_json::from_str(&stdout(&output))?;
    let items = parsed.as_array().expect("array export");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["repo_filename"], "flows/diagram.png");
    assert_eq!(items[0]["type"], "asset");
    assert_eq!(items[1]["repo_filename"], "flows/plain.py");
    assert_eq!(items[1]["metadata"]["title"], "Plain");
    assert!(items[1]["filename"].as_str().unwrap().ends_with("examples/flows/plain.py"));
    Ok(())
}

#[test]
fn invalid_frontmatter_is_reported_not_fatal() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/bad.py", "# ---\n# deploy: maybe\n# ---\n")?;
    tree.write("flows/good.py", "print('ok')\n")?;

    let output = tree.run(&["list"])?;
    assert_exit(&output, 0)?;
    assert!(stdout(&output).starts_with("Found 1 examples:"));
    assert!(stderr(&output).contains("warning: skipping"));
    assert!(stderr(&output).contains("'deploy'"));
    Ok(())
}

#[test]
fn ambiguous_run_lists_candidates_and_runs_nothing() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example("flows/retries.py", "touch ran_flows", "")?;
    tree.shell_example("tasks/retries.py", "touch ran_tasks", "")?;

    let output = tree.run(&["run-example", "--example", "retries"])?;
    assert_exit(&output, 1)?;
    let err = stderr(&output);
    assert!(err.contains("Multiple examples found matching 'retries'"));
    assert!(err.contains("- flows/retries.py"));
    assert!(err.contains("- tasks/retries.py"));
    assert!(!tree.root.join("ran_flows").exists());
    assert!(!tree.root.join("ran_tasks").exists());
    Ok(())
}

#[test]
fn run_example_executes_from_examples_root() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example("flows/hello.py", "touch hello_ran", "")?;

    let output = tree.run(&["run-example", "-e", "hello"])?;
    assert_exit(&output, 0)?;
    let out = stdout(&output);
    assert!(out.contains("Running: flows/hello.py"));
    assert!(out.contains("CLI args: sh -c touch hello_ran"));
    assert!(out.contains("Success after "));
    assert!(tree.root.join("hello_ran").exists());
    Ok(())
}

#[test]
fn run_example_reports_failure_code() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example("flows/broken.py", "exit 2", "")?;

    let output = tree.run(&["run-example", "-e", "flows/broken.py"])?;
    assert_exit(&output, 1)?;
    assert!(stdout(&output).contains("with return code 2"));
    Ok(())
}

#[test]
fn run_example_overlays_declared_env() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example(
        "flows/env_check.py",
        "test \"$EXAMPLE_FLAG\" = on",
        "# env:\n#   EXAMPLE_FLAG: \"on\"\n",
    )?;

    let output = tree.run(&["run-example", "-e", "env_check"])?;
    assert_exit(&output, 0)?;
    Ok(())
}

#[test]
fn run_example_times_out() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example("flows/slow.py", "exec sleep 10", "")?;

    let output = tree.run(&["run-example", "-e", "slow", "--timeout", "1"])?;
    assert_exit(&output, 1)?;
    assert!(stdout(&output).contains("Timed out after "));
    Ok(())
}

#[test]
fn run_example_requires_a_target() -> Result<()> {
    let tree = ExampleTree::new()?;
    let output = tree.run(&["run-example"])?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn random_run_skips_pytest_opt_outs() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example("flows/only.py", "touch picked", "")?;
    tree.shell_example("flows/never.py", "touch wrong", "# pytest: false\n")?;

    let output = tree.run(&["run-example", "--random"])?;
    assert_exit(&output, 0)?;
    assert!(tree.root.join("picked").exists());
    assert!(!tree.root.join("wrong").exists());
    Ok(())
}

#[test]
fn deploy_list_is_a_dry_run() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example("flows/deploy_me.py", "touch deployed", "# deploy: true\n")?;
    tree.shell_example("flows/stay.py", "touch wrong", "")?;

    let output = tree.run(&["deploy", "--list"])?;
    assert_exit(&output, 0)?;
    assert_eq!(
        stdout(&output),
        "Found 1 examples that would be deployed:\n\
         - flows/deploy_me.py\n  Command: sh -c touch deployed\n"
    );
    assert!(!tree.root.join("deployed").exists());
    Ok(())
}

#[test]
fn deploy_all_runs_every_candidate() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example("flows/one.py", "touch one", "# deploy: true\n")?;
    tree.shell_example("tasks/two.py", "touch two", "# deploy: true\n")?;

    let output = tree.run(&["deploy", "--all"])?;
    assert_exit(&output, 0)?;
    assert!(stdout(&output).contains("Successfully deployed 2 examples"));
    assert!(tree.root.join("one").exists());
    assert!(tree.root.join("two").exists());
    Ok(())
}

#[test]
fn deploy_all_counts_failures() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.shell_example("flows/ok.py", "true", "# deploy: true\n")?;
    tree.shell_example("flows/bad.py", "exit 1", "# deploy: true\n")?;

    let output = tree.run(&["deploy", "--all"])?;
    assert_exit(&output, 1)?;
    let out = stdout(&output);
    assert!(out.contains("Failed to deploy flows/bad.py"));
    assert!(out.contains("Failed to deploy 1 examples"));
    Ok(())
}

#[test]
fn generate_docs_skips_drafts_and_summarizes() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/draft.py", "# ---\n# draft: true\n# ---\nprint('wip')\n")?;
    tree.write("flows/ready.py", "# Ready\nprint('ok')\n")?;
    let out_dir = tree.scratch("docs");

    let output = tree.run(&["generate-docs", "-o", out_dir.to_str().unwrap()])?;
    assert_exit(&output, 0)?;
    assert!(
        stdout(&output).contains("Generated 1 docs, skipped 1 (1 draft, 0 excluded)"),
        "unexpected summary: {}",
        stdout(&output)
    );
    assert!(out_dir.join("ready.mdx").exists());
    assert!(!out_dir.join("draft.mdx").exists());
    Ok(())
}

#[test]
fn generate_docs_categorized_with_index() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("01_getting_started/01_hello_world.py", "# Hello\nprint('hi')\n")?;
    let out_dir = tree.scratch("site");

    let output = tree.run(&[
        "generate-docs",
        "-o",
        out_dir.to_str().unwrap(),
        "-e",
        ".md",
        "--layout",
        "categorized",
        "--index",
        "--title",
        "Prefect Examples",
    ])?;
    assert_exit(&output, 0)?;
    assert!(out_dir.join("01_getting_started/01_hello_world.md").exists());
    let index = fs::read_to_string(out_dir.join("index.md"))?;
    assert!(index.starts_with("# Prefect Examples\n\n"));
    assert!(index.contains(
        "## 01 Getting Started\n\n- [01 Hello World](01_getting_started/01_hello_world.md)\n"
    ));
    Ok(())
}

#[test]
fn generate_docs_rejects_unknown_extension() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/a.py", "x = 1\n")?;
    let output = tree.run(&["generate-docs", "-e", ".html"])?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_plan_selects_changed_examples() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/hello.py", "print('hi')\n")?;
    tree.write("flows/other.py", "print('hi')\n")?;

    let output = tree.run(&[
        "test-plan",
        "--changed-files",
        "examples/flows/hello.py",
        "README.md",
    ])?;
    assert_exit(&output, 0)?;
    assert_eq!(
        stdout(&output),
        "Test plan: 1 examples to test\n- flows/hello.py\n"
    );

    let output = tree.run(&[
        "test-plan",
        "--format",
        "json",
        "--changed-files",
        "examples/flows/other.py",
    ])?;
    assert_exit(&output, 0)?;
    let parsed: Value = serde_json::from_str(&stdout(&output))?;
    assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    assert_eq!(parsed[0]["repo_filename"], "flows/other.py");
    Ok(())
}

#[test]
fn test_plan_tooling_change_selects_everything() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/a.py", "x = 1\n")?;
    tree.write("tasks/b.py", "x = 1\n")?;

    let output = tree.run(&["test-plan", "--changed-files", "internal/utils.py"])?;
    assert_exit(&output, 0)?;
    assert!(stdout(&output).starts_with("Test plan: 2 examples to test"));
    assert!(stderr(&output).contains("Internal tools changed (internal/utils.py)"));
    Ok(())
}

#[test]
fn empty_test_plan_exits_nonzero_unless_allowed() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/a.py", "x = 1\n")?;

    let output = tree.run(&["test-plan", "--changed-files", "docs/readme.md"])?;
    assert_exit(&output, 1)?;
    assert_eq!(stdout(&output), "No examples to test.\n");
    assert!(stderr(&output).is_empty());

    let output = tree.run(&[
        "test-plan",
        "--allow-empty",
        "--changed-files",
        "docs/readme.md",
    ])?;
    assert_exit(&output, 0)?;
    Ok(())
}

#[test]
fn test_plan_reads_github_event() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/hello.py", "print('hi')\n")?;
    let event = tree.scratch("event.json");
    fs::write(
        &event,
        r#"{"pull_request": {"changed_files": [{"filename": "examples/flows/hello.py"}]}}"#,
    )?;

    let mut cmd = tree.command();
    cmd.env("GITHUB_EVENT_PATH", &event)
        .args(["test-plan", "--github-action"]);
    let output = run_command(cmd)?;
    assert_exit(&output, 0)?;
    assert!(stdout(&output).contains("- flows/hello.py"));
    Ok(())
}

#[test]
fn missing_root_is_fatal() -> Result<()> {
    let tree = ExampleTree::new()?;
    let missing = tree.scratch("nope/examples");
    let mut cmd = examples_command();
    cmd.arg("--root").arg(&missing).arg("list");
    let output = run_command(cmd)?;
    assert_exit(&output, 1)?;
    assert!(stderr(&output).contains("Can't find directory"));
    Ok(())
}

#[test]
fn root_can_come_from_env() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/a.py", "x = 1\n")?;
    let mut cmd = examples_command();
    cmd.env("EXAMPLES_ROOT", &tree.root).arg("list");
    let output = run_command(cmd)?;
    assert_exit(&output, 0)?;
    assert!(stdout(&output).contains("flows/a.py"));
    Ok(())
}

#[test]
fn help_names_the_binary() -> Result<()> {
    let mut cmd = examples_command();
    cmd.arg("--help");
    let output = run_command(cmd)?;
    assert_exit(&output, 0)?;
    assert!(stdout(&output).contains("Usage: example-docs"));
    Ok(())
}

#[test]
fn rejected_files_are_reported_once() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/bad.py", "# ---\n# deploy: maybe\n# ---\n")?;

    let mut cmd = tree.command();
    cmd.env("RUST_LOG", "warn").arg("list");
    let output = run_command(cmd)?;
    assert_exit(&output, 0)?;
    assert_eq!(stderr(&output).matches("bad.py").count(), 1);
    Ok(())
}

#[test]
fn sibling_tree_is_cataloged_and_planned() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write("flows/a.py", "x = 1\n")?;
    tree.write_repo("pacc/loose.py", "x = 1\n")?;
    tree.write_repo("pacc/jobs/nightly.py", "x = 1\n")?;

    let output = tree.run(&["list"])?;
    assert_exit(&output, 0)?;
    assert_eq!(
        stdout(&output),
        "Found 3 examples:\n\
         [ -    ] flows/a.py\n\
         [ -    ] pacc/jobs/nightly.py\n\
         [ -    ] pacc/loose.py\n"
    );

    let output = tree.run(&["test-plan", "--changed-files", "pacc/loose.py", "flows/a.py"])?;
    assert_exit(&output, 0)?;
    assert_eq!(
        stdout(&output),
        "Test plan: 1 examples to test\n- pacc/loose.py\n"
    );

    let mut cmd = tree.command();
    cmd.env("EXAMPLES_EXTRA_ROOTS", "").arg("list");
    let output = run_command(cmd)?;
    assert!(stdout(&output).starts_with("Found 1 examples:"));
    Ok(())
}

#[test]
fn generate_docs_card_index() -> Result<()> {
    let tree = ExampleTree::new()?;
    tree.write(
        "flows/hello.py",
        "# ---\n# title: Hello\n# description: Say hello\n# ---\nprint('hi')\n",
    )?;
    let out_dir = tree.scratch("site");

    let output = tree.run(&[
        "generate-docs",
        "-o",
        out_dir.to_str().unwrap(),
        "--index-style",
        "cards",
        "--card-href-prefix",
        "/docs/",
    ])?;
    assert_exit(&output, 0)?;
    let index = fs::read_to_string(out_dir.join("index.mdx"))?;
    assert!(index.starts_with("---\ntitle: Examples\n---\n<CardGroup cols={3}>\n"));
    assert!(index.contains("<Card title=\"Hello\" icon=\"play\" href=\"/docs/hello\">"));

    tree.write("flows/untitled.py", "print('no header')\n")?;
    let output = tree.run(&[
        "generate-docs",
        "-o",
        out_dir.to_str().unwrap(),
        "--index-style",
        "cards",
    ])?;
    assert_exit(&output, 1)?;
    assert!(stderr(&output).contains("flows/untitled.py does not have a title or description"));
    Ok(())
}

#[test]
fn test_plan_reads_git_diff() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tree = ExampleTree::new()?;
    tree.write("flows/a.py", "x = 1\n")?;
    tree.write("flows/b.py", "x = 1\n")?;
    tree.git(&["init", "-q"])?;
    tree.git(&["add", "."])?;
    tree.git(&["commit", "-q", "-m", "examples"])?;
    tree.write("flows/b.py", "x = 2\n")?;

    let output = tree.run(&["test-plan", "--git-diff", "HEAD"])?;
    assert_exit(&output, 0)?;
    assert_eq!(
        stdout(&output),
        "Test plan: 1 examples to test\n- flows/b.py\n"
    );

    let output = tree.run(&["test-plan", "--git-diff", "no-such-ref"])?;
    assert_exit(&output, 1)?;
    assert!(stderr(&output).contains("git diff --name-only no-such-ref failed"));
    Ok(())
}
