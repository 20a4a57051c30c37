//! Shared harness for git-waze integration tests.
//!
//! Builds repositories whose packs are assembled byte by byte: entry
//! headers are real, bodies are filler, since git-waze never inflates them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

// ──────────────────────────── Types ────────────────────────────

/// Captured output from running the binary.
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

// ──────────────────────────── Binary Discovery ────────────────────────────

/// Path to the compiled `git-waze` binary.
pub fn waze_bin() -> PathBuf {
    let mut path = std::env::current_exe()
        .unwrap()
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    path.push("git-waze");
    path
}

/// Run `git-waze` with the given arguments.
pub fn waze(args: &[&str]) -> CommandResult {
    let output = Command::new(waze_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run git-waze");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    }
}

// ──────────────────────────── Pack Writer ────────────────────────────

const BLOB: u8 = 3;

/// One entry placed in a test pack.
pub struct Entry {
    pub oid: [u8; 20],
    /// Size declared in the entry header.
    pub declared: u64,
    /// Header plus body length, the gap to the next entry.
    pub disk: u64,
}

impl Entry {
    pub fn hex(&self) -> String {
        self.oid.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Collects entries, then writes `pack-<name>.pack` and `.idx`.
pub struct TestPack {
    data: Vec<u8>,
    entries: Vec<(Entry, u64)>,
}

impl TestPack {
    pub fn new() -> Self {
        let mut data = b"PACK".to_vec();
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        Self { data, entries: Vec::new() }
    }

    /// Add a blob that claims `declared` bytes and occupies `disk` bytes.
    pub fn add(&mut self, tag: u8, declared: u64, disk: u64) -> &mut Self {
        let header = encode_entry_header(BLOB, declared);
        assert!(disk >= header.len() as u64, "entry smaller than its header");
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(&header);
        self.data
            .resize(self.data.len() + (disk as usize - header.len()), 0);
        let entry = Entry {
            oid: [tag; 20],
            declared,
            disk,
        };
        self.entries.push((entry, offset));
        self
    }

    /// Write the pack into `<git_dir>/objects/pack/` and return its entries.
    pub fn write(mut self, git_dir: &Path, name: &str) -> Vec<Entry> {
        let pack_dir = git_dir.join("objects/pack");
        std::fs::create_dir_all(&pack_dir).unwrap();

        let count = self.entries.len() as u32;
        self.data[8..12].copy_from_slice(&count.to_be_bytes());
        self.data.extend_from_slice(&[0u8; 20]);
        std::fs::write(pack_dir.join(format!("pack-{name}.pack")), &self.data).unwrap();

        self.entries.sort_by(|a, b| a.0.oid.cmp(&b.0.oid));
        std::fs::write(pack_dir.join(format!("pack-{name}.idx")), build_index(&self.entries)).unwrap();
        self.entries.into_iter().map(|(e, _)| e).collect()
    }
}

fn build_index(entries: &[(Entry, u64)]) -> Vec<u8> {
    let mut buf = vec![0xff, 0x74, 0x4f, 0x63];
    buf.extend_from_slice(&2u32.to_be_bytes());

    let mut fanout = [0u32; 256];
    for (e, _) in entries {
        fanout[e.oid[0] as usize] += 1;
    }
    for i in 1..256 {
        fanout[i] += fanout[i - 1];
    }
    for count in fanout {
        buf.extend_from_slice(&count.to_be_bytes());
    }
    for (e, _) in entries {
        buf.extend_from_slice(&e.oid);
    }
    for _ in entries {
        buf.extend_from_slice(&0u32.to_be_bytes());
    }
    for (_, offset) in entries {
        buf.extend_from_slice(&(*offset as u32).to_be_bytes());
    }
    buf.extend_from_slice(&[0u8; 40]);
    buf
}

fn encode_entry_header(kind: u8, size: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut s = size;
    let mut c = (kind << 4) | (s & 0x0f) as u8;
    s >>= 4;
    while s > 0 {
        buf.push(c | 0x80);
        c = (s & 0x7f) as u8;
        s >>= 7;
    }
    buf.push(c);
    buf
}

// ──────────────────────────── Repo Setup ────────────────────────────

/// Create an empty work tree at `<root>/<name>` with a `.git/objects` dir.
pub fn work_tree(root: &Path, name: &str) -> PathBuf {
    let wt = root.join(name);
    std::fs::create_dir_all(wt.join(".git/objects/pack")).unwrap();
    wt
}

/// Create an empty bare repository at `<root>/<name>`.
pub fn bare_repo(root: &Path, name: &str) -> PathBuf {
    let repo = root.join(name);
    std::fs::create_dir_all(repo.join("objects/pack")).unwrap();
    repo
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}
