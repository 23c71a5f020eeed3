use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use gcdisc::bi2::{BootInfo, Region};
use gcdisc::boot::BootHeader;

const DISC_SIZE: &str = "0x40000";

fn get_gcdt_cmd() -> Command {
    Command::cargo_bin("gcdt").unwrap()
}

fn write_tree(root: &Path) {
    let sys = root.join("sys");
    fs::create_dir_all(&sys).unwrap();

    let mut boot = BootHeader::blank();
    boot.set_game_code(u32::from_be_bytes(*b"GCLI"));
    boot.set_maker_code(u16::from_be_bytes(*b"01"));
    boot.set_game_name("Command Line Test").unwrap();
    fs::write(sys.join("boot.bin"), boot.to_bytes().unwrap()).unwrap();

    let mut info = BootInfo::blank();
    info.set_region(Region::NtscU);
    fs::write(sys.join("bi2.bin"), info.to_bytes().unwrap()).unwrap();

    let mut apploader = vec![0u8; 0x20];
    apploader[..10].copy_from_slice(b"2005/06/01");
    apploader[0x10..0x14].copy_from_slice(&0x8120_0000u32.to_be_bytes());
    apploader[0x14..0x18].copy_from_slice(&0x20u32.to_be_bytes());
    apploader.extend_from_slice(&[0x4E; 0x20]);
    fs::write(sys.join("apploader.img"), apploader).unwrap();

    let mut dol = vec![0u8; 0x100];
    dol[0x00..0x04].copy_from_slice(&0x100u32.to_be_bytes());
    dol[0x90..0x94].copy_from_slice(&0x40u32.to_be_bytes());
    dol.extend_from_slice(&[0x60; 0x40]);
    fs::write(sys.join("main.dol"), dol).unwrap();

    let files = root.join("files");
    fs::create_dir_all(files.join("audio")).unwrap();
    fs::write(files.join("audio/bgm.adp"), vec![0xA1; 0x300]).unwrap();
    fs::write(files.join("readme.txt"), b"hello disc").unwrap();
}

fn build_image(dir: &Path) -> PathBuf {
    let tree = dir.join("tree");
    write_tree(&tree);
    let image = dir.join("disc.iso");
    get_gcdt_cmd()
        .arg("build")
        .arg("--path")
        .arg(&tree)
        .arg("--destination")
        .arg(&image)
        .arg("--disc-size")
        .arg(DISC_SIZE)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 files"));
    image
}

#[test]
fn test_build_writes_full_size_image() {
    let dir = tempfile::tempdir().unwrap();
    let image = build_image(dir.path());
    assert_eq!(fs::metadata(image).unwrap().len(), 0x40000);
}

#[test]
fn test_info() {
    let dir = tempfile::tempdir().unwrap();
    let image = build_image(dir.path());
    let mut cmd = get_gcdt_cmd();
    cmd.arg("info").arg("--path").arg(&image);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Game code: GCLI"))
        .stdout(predicate::str::contains("Game name: Command Line Test"))
        .stdout(predicate::str::contains("Region: NTSC-U"))
        .stdout(predicate::str::contains("built 2005/06/01"))
        .stdout(predicate::str::contains("2 files"));
}

#[test]
fn test_ls() {
    let dir = tempfile::tempdir().unwrap();
    let image = build_image(dir.path());
    get_gcdt_cmd()
        .arg("ls")
        .arg("--path")
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("/audio/"))
        .stdout(predicate::str::contains("/audio/bgm.adp"))
        .stdout(predicate::str::contains("/readme.txt"));

    get_gcdt_cmd()
        .arg("ls")
        .arg("--path")
        .arg(&image)
        .arg("--folder")
        .arg("audio")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files in /audio"))
        .stdout(predicate::str::contains("bgm.adp"))
        .stdout(predicate::str::contains("readme.txt").not());
}

#[test]
fn test_ls_missing_folder_fails() {
    let dir = tempfile::tempdir().unwrap();
    let image = build_image(dir.path());
    get_gcdt_cmd()
        .arg("ls")
        .arg("--path")
        .arg(&image)
        .arg("--folder")
        .arg("nowhere")
        .assert()
        .failure();
}

#[test]
fn test_check() {
    let dir = tempfile::tempdir().unwrap();
    let image = build_image(dir.path());
    get_gcdt_cmd()
        .arg("check")
        .arg("--path")
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));

    let mut bytes = fs::read(&image).unwrap();
    bytes.truncate(0x3000);
    let broken = dir.path().join("broken.iso");
    fs::write(&broken, bytes).unwrap();
    get_gcdt_cmd()
        .arg("check")
        .arg("--path")
        .arg(&broken)
        .assert()
        .failure();
}

#[test]
fn test_extract() {
    let dir = tempfile::tempdir().unwrap();
    let image = build_image(dir.path());
    let out = dir.path().join("out");
    get_gcdt_cmd()
        .arg("extract")
        .arg("--path")
        .arg(&image)
        .arg("--destination")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted 2 files"));

    assert_eq!(fs::read(out.join("files/readme.txt")).unwrap(), b"hello disc");
    assert!(out.join("sys/fst.bin").is_file());
}

#[test]
fn test_build_with_alignment_rules() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    write_tree(&tree);
    let rules = dir.path().join("align.json");
    fs::write(&rules, r#"{"extensions": {"adp": 32768}}"#).unwrap();
    let image = dir.path().join("disc.iso");
    get_gcdt_cmd()
        .arg("build")
        .arg("--path")
        .arg(&tree)
        .arg("--destination")
        .arg(&image)
        .arg("--disc-size")
        .arg(DISC_SIZE)
        .arg("--alignment")
        .arg(&rules)
        .assert()
        .success();

    let decoded = gcdisc::DiscImage::from_image_file(&image).unwrap();
    let index = decoded.fst().find_entry("audio/bgm.adp").unwrap();
    let (_, position, _) = decoded
        .fst()
        .file_entries()
        .find(|&(entry, _, _)| entry == index)
        .unwrap();
    assert_eq!(position % 0x8000, 0);
}

#[test]
fn test_bad_disc_size() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    write_tree(&tree);
    get_gcdt_cmd()
        .arg("build")
        .arg("--path")
        .arg(&tree)
        .arg("--destination")
        .arg(dir.path().join("disc.iso"))
        .arg("--disc-size")
        .arg("huge")
        .assert()
        .failure();
}

#[test]
fn test_missing_path() {
    get_gcdt_cmd().arg("info").assert().failure();
}
