// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use docker_update::{
    command::{self, CommandOutput, CommandRunner},
    Registry, UpdateError, Updater,
};

use anyhow::Result;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    env::current_dir,
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
};

#[derive(Debug, Default)]
struct FakeRunner {
    replies: RefCell<VecDeque<CommandOutput>>,
    calls: RefCell<Vec<String>>,
}

impl FakeRunner {
    fn new(replies: impl IntoIterator<Item = CommandOutput>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().collect()),
            calls: RefCell::default(),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &str) -> command::Result<CommandOutput> {
        self.calls.borrow_mut().push(command.to_string());
        Ok(self.replies.borrow_mut().pop_front().unwrap_or_default())
    }
}

fn mounted() -> CommandOutput {
    CommandOutput::new("● ZFS-Main-Docker.mount\n     Active: active (mounted)\n", 0)
}

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn builtin_registry_in(dir: impl Into<PathBuf>) -> Registry {
    let dir = dir.into();
    let mut registry = Registry::builtin();
    for profile in registry.machines.values_mut() {
        profile.working_dir = dir.clone();
    }

    registry
}

fn compose_call(path: &Path) -> String {
    format!(
        "docker compose -f {} up --force-recreate --build -d",
        path.display()
    )
}

#[sealed_test]
fn jeeves_jr_update_success() -> Result<()> {
    let dir = current_dir()?;
    let runner = FakeRunner::new([mounted(), CommandOutput::new("", 0)]);
    let updater = Updater::new(builtin_registry_in(&dir), &runner);

    updater.update("jeeves-jr", &env(&[("TUNNEL_TOKEN", "test_token")]))?;

    assert_eq!(
        read_to_string("cloudflare_tunnel.env")?,
        "TUNNEL_TOKEN=test_token\n"
    );
    assert_eq!(
        runner.calls(),
        vec![
            "systemctl status ZFS-Main-Docker.mount".to_string(),
            compose_call(&dir.join("docker-compose.yml")),
        ]
    );

    Ok(())
}

#[sealed_test]
fn jeeves_jr_update_inactive_mount() -> Result<()> {
    let dir = current_dir()?;
    let runner = FakeRunner::new([CommandOutput::new("inactive", 0)]);
    let updater = Updater::new(builtin_registry_in(&dir), &runner);

    let error = updater
        .update("jeeves-jr", &env(&[("TUNNEL_TOKEN", "test_token")]))
        .unwrap_err();

    assert!(matches!(error, UpdateError::Mount(_)));
    assert_eq!(
        error.to_string(),
        "ZFS-Main-Docker is not up with output: inactive returncode: 0"
    );
    assert!(!Path::new("cloudflare_tunnel.env").exists());
    assert_eq!(runner.calls().len(), 1);

    Ok(())
}

#[sealed_test]
fn jeeves_jr_update_compose_failure() -> Result<()> {
    let dir = current_dir()?;
    let runner = FakeRunner::new([mounted(), CommandOutput::new("error output", 1)]);
    let updater = Updater::new(builtin_registry_in(&dir), &runner);

    let error = updater
        .update("jeeves-jr", &env(&[("TUNNEL_TOKEN", "test_token")]))
        .unwrap_err()
        .to_string();

    assert!(error.contains('1'));
    assert!(error.contains("error output"));
    assert_eq!(
        read_to_string("cloudflare_tunnel.env")?,
        "TUNNEL_TOKEN=test_token\n"
    );

    Ok(())
}

#[sealed_test]
fn jeeves_update_writes_every_secret_file() -> Result<()> {
    let dir = current_dir()?;
    create_dir_all("postgres")?;
    create_dir_all("qbittorrent")?;
    write("qbittorrent/vpn.env", "PIA_USERNAME=stale\n")?;
    let runner = FakeRunner::new([mounted(), mounted()]);
    let updater = Updater::new(builtin_registry_in(&dir), &runner);

    updater.update(
        "jeeves",
        &env(&[
            ("POSTGRES_USER", "admin"),
            ("POSTGRES_PASSWORD", "hunter2"),
            ("PIA_USERNAME", "p1234"),
            ("PIA_PASSWORD", "secret"),
            ("LAN_NETWORK", "192.168.1.0/24"),
        ]),
    )?;

    assert_eq!(
        read_to_string("postgres/postgres.env")?,
        "POSTGRES_USER=admin\nPOSTGRES_PASSWORD=hunter2\n"
    );
    assert_eq!(
        read_to_string("qbittorrent/vpn.env")?,
        "PIA_USERNAME=p1234\nPIA_PASSWORD=secret\nLAN_NETWORK=192.168.1.0/24\n"
    );
    assert_eq!(
        runner.calls(),
        vec![
            "systemctl status ZFS-Media-Docker.mount".to_string(),
            "systemctl status ZFS-Storage-Main.mount".to_string(),
            compose_call(&dir.join("endlessh/docker-compose.yml")),
            compose_call(&dir.join("sccache/docker-compose.yml")),
            compose_call(&dir.join("postgres/docker-compose.yml")),
            compose_call(&dir.join("qbittorrent/docker-compose.yml")),
        ]
    );

    Ok(())
}

#[sealed_test]
fn update_from_registry_file() -> Result<()> {
    let dir = current_dir()?;
    write(
        "machines.toml",
        format!(
            r#"
            [machine.alfred]
            working_dir = "{}"
            mounts = [{{ pool = "Backup", dataset = "Stacks" }}]
            compose_files = ["docker-compose.yml"]

            [[machine.alfred.secret_file]]
            path = "alfred.env"
            variables = ["ALFRED_TOKEN"]
            "#,
            dir.display()
        ),
    )?;
    let runner = FakeRunner::new([mounted()]);
    let updater = Updater::new(Registry::load("machines.toml")?, &runner);

    updater.update("alfred", &env(&[("ALFRED_TOKEN", "batcave")]))?;

    assert_eq!(read_to_string("alfred.env")?, "ALFRED_TOKEN=batcave\n");
    assert_eq!(
        runner.calls(),
        vec![
            "systemctl status ZFS-Backup-Stacks.mount".to_string(),
            compose_call(&dir.join("docker-compose.yml")),
        ]
    );

    Ok(())
}

#[test]
fn update_invalid_machine_name() {
    let runner = FakeRunner::default();
    let updater = Updater::new(Registry::builtin(), &runner);

    let error = updater.update("monkey-d-luffy", &env(&[])).unwrap_err();

    assert_eq!(error.to_string(), "'monkey-d-luffy' is invalid or not supported");
    assert!(runner.calls().is_empty());
}
