use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use turtle_machine::assembler::DEFAULT_LABEL_CAP;
use turtle_machine::builder::MAX_STREAM_LEN;
use turtle_machine::verify::verify;
use turtle_machine::{Canvas, HEADER_LEN, ProgramImage, assemble_source, run};

fn demos() -> Vec<PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "tasm"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty(), "no demos in {}", dir.display());
    paths
}

fn assemble(path: &Path) -> Vec<u8> {
    let source = fs::read_to_string(path).unwrap();
    let mut buffer = vec![0u8; HEADER_LEN + MAX_STREAM_LEN];
    let descriptor = assemble_source::<DEFAULT_LABEL_CAP>(&source, &mut buffer)
        .unwrap_or_else(|err| panic!("{}: {err}", path.display()));
    buffer.truncate(descriptor.length);
    buffer
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("drawer-demos-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn every_demo_verifies_and_halts() {
    for path in demos() {
        let bytes = assemble(&path);
        assert_eq!(bytes, assemble(&path), "{}", path.display());
        verify(&bytes[HEADER_LEN..]).unwrap_or_else(|err| panic!("{}: {err}", path.display()));

        let image = ProgramImage::with_header(&bytes).unwrap();
        let mut canvas = vec![0u8; Canvas::required_bytes(image.canvas_size())];
        let run = run(image, &mut canvas).unwrap();
        let halted = run
            .outcome
            .unwrap_or_else(|fault| panic!("{}: {:?}", path.display(), fault));
        assert!(halted.steps > 0);
        assert!(run.canvas.count_set() > 0, "{} drew nothing", path.display());
    }
}

#[test]
fn draw_writes_a_pbm() {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/spiral.tasm");
    let output = scratch("spiral.pbm");

    let status = Command::new(env!("CARGO_BIN_EXE_drawer"))
        .arg("draw")
        .arg(&source)
        .arg("-o")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());

    let pbm = fs::read(&output).unwrap();
    let header = b"P4\n256 256\n";
    assert_eq!(&pbm[..header.len()], header);
    assert_eq!(pbm.len(), header.len() + 32 * 256);
    assert!(pbm[header.len()..].iter().any(|byte| *byte != 0));
}

#[test]
fn assemble_then_run_matches_draw() {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/squares.tasm");
    let image = scratch("squares.bin");
    let via_run = scratch("squares-run.pbm");
    let via_draw = scratch("squares-draw.pbm");
    let drawer = env!("CARGO_BIN_EXE_drawer");

    let status = Command::new(drawer)
        .args(["assemble".as_ref(), source.as_os_str(), "-o".as_ref(), image.as_os_str()])
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read(&image).unwrap(), assemble(&source));

    let status = Command::new(drawer)
        .args(["run".as_ref(), image.as_os_str(), "-o".as_ref(), via_run.as_os_str()])
        .status()
        .unwrap();
    assert!(status.success());

    let status = Command::new(drawer)
        .args(["draw".as_ref(), source.as_os_str(), "-o".as_ref(), via_draw.as_os_str()])
        .status()
        .unwrap();
    assert!(status.success());

    assert_eq!(fs::read(&via_run).unwrap(), fs::read(&via_draw).unwrap());
}

#[test]
fn fault_still_writes_the_canvas() {
    let source = scratch("runaway.tasm");
    let output = scratch("runaway.pbm");
    fs::write(&source, "WIDTH 16\nHEIGHT 16\nDRW\nSTO B 1\nloop: MOV\nJNZ B loop\n").unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_drawer"))
        .arg("draw")
        .arg(&source)
        .arg("-o")
        .arg(&output)
        .arg("--max-steps")
        .arg("20")
        .output()
        .unwrap();
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("step limit of 20 instructions exceeded"), "{stderr}");
    assert!(stderr.contains("registers: A=0 B=1"), "{stderr}");

    let pbm = fs::read(&output).unwrap();
    assert!(pbm.starts_with(b"P4\n16 16\n"));
}

#[test]
fn assembly_errors_name_the_line() {
    let source = scratch("broken.tasm");
    fs::write(&source, "DRW\nJNZ B nowhere\nHLT\n").unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_drawer"))
        .arg("assemble")
        .arg(&source)
        .arg("-o")
        .arg(scratch("broken.bin"))
        .output()
        .unwrap();
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("line 2: label `nowhere` is never defined"), "{stderr}");
}

#[test]
fn disasm_accepts_a_jump_to_the_end() {
    let source = scratch("tail.tasm");
    let image = scratch("tail.bin");
    fs::write(&source, "STO B 0\nJNZ B end\nHLT\nend:\n").unwrap();
    let drawer = env!("CARGO_BIN_EXE_drawer");

    let status = Command::new(drawer)
        .args(["assemble".as_ref(), source.as_os_str(), "-o".as_ref(), image.as_os_str()])
        .status()
        .unwrap();
    assert!(status.success());

    let result = Command::new(drawer).arg("disasm").arg(&image).output().unwrap();
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    let listing = String::from_utf8(result.stdout).unwrap();
    assert!(listing.contains("0x0004  JNZ B @0x0009"), "{listing}");
}
