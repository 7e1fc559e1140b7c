//! End-to-end pipeline tests: DTB files on disk, through scan and
//! firmware expansion, down to the rendered report.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use dtbmods::firmware::expand_firmware;
use dtbmods::report::write_report;
use dtbmods::{scan_dtb, KmodIndex, ModuleIndex, OrderedSet, ScanError};

// ---------------------------------------------------------------------
// Minimal DTB writer (version 17 blob: header, empty rsvmap, structure
// block, strings block).
// ---------------------------------------------------------------------

#[derive(Default)]
struct Dtb {
    structure: Vec<u8>,
    strings: Vec<u8>,
}

impl Dtb {
    fn begin(mut self, name: &str) -> Self {
        self.structure.extend_from_slice(&1u32.to_be_bytes());
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
        self
    }

    fn prop(mut self, name: &str, value: &[u8]) -> Self {
        let name_off = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.structure.extend_from_slice(&3u32.to_be_bytes());
        self.structure
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.structure.extend_from_slice(&name_off.to_be_bytes());
        self.structure.extend_from_slice(value);
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
        self
    }

    fn end(mut self) -> Self {
        self.structure.extend_from_slice(&2u32.to_be_bytes());
        self
    }

    fn bytes(mut self) -> Vec<u8> {
        self.structure.extend_from_slice(&9u32.to_be_bytes());
        let off_struct = 40 + 16;
        let off_strings = off_struct + self.structure.len();
        let totalsize = off_strings + self.strings.len();

        let mut blob = Vec::new();
        blob.extend_from_slice(&0xd00d_feedu32.to_be_bytes());
        blob.extend_from_slice(&(totalsize as u32).to_be_bytes());
        blob.extend_from_slice(&(off_struct as u32).to_be_bytes());
        blob.extend_from_slice(&(off_strings as u32).to_be_bytes());
        blob.extend_from_slice(&40u32.to_be_bytes());
        blob.extend_from_slice(&17u32.to_be_bytes());
        blob.extend_from_slice(&16u32.to_be_bytes());
        blob.extend_from_slice(&0u32.to_be_bytes());
        blob.extend_from_slice(&(self.strings.len() as u32).to_be_bytes());
        blob.extend_from_slice(&(self.structure.len() as u32).to_be_bytes());
        blob.extend_from_slice(&[0u8; 16]);
        blob.extend_from_slice(&self.structure);
        blob.extend_from_slice(&self.strings);
        blob
    }
}

fn write_dtb(dir: &TempDir, name: &str, blob: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, blob).unwrap();
    path
}

/// Fake index with metadata, for exercising firmware expansion without
/// crafting ELF objects.
#[derive(Default)]
struct FakeIndex {
    aliases: HashMap<String, Vec<String>>,
    info: HashMap<String, Vec<(String, String)>>,
}

impl ModuleIndex for FakeIndex {
    fn lookup_alias(&self, alias: &str) -> Vec<String> {
        self.aliases.get(alias).cloned().unwrap_or_default()
    }

    fn module_info(&self, name: &str) -> Option<Vec<(String, String)>> {
        self.info.get(name).cloned()
    }
}

#[test]
fn scan_against_real_alias_db() {
    let modules_dir = TempDir::new().unwrap();
    fs::write(
        modules_dir.path().join("modules.alias"),
        "alias of:N*T*Cvendor,chip* chipdrv\nalias of:N*T*Cacme,panel paneldrv\n",
    )
    .unwrap();
    let index = KmodIndex::open(modules_dir.path()).unwrap();

    let dtb_dir = TempDir::new().unwrap();
    let blob = Dtb::default()
        .begin("")
        .begin("chip@0")
        .prop("compatible", b"vendor,chip-rev2\0")
        .end()
        .begin("display")
        .prop("compatible", b"acme,panel\0")
        .prop("firmware-name", b"acme/panel.fw\0")
        .end()
        .end()
        .bytes();
    let dtb = write_dtb(&dtb_dir, "board.dtb", &blob);

    let mut modules = OrderedSet::new();
    let mut firmware = OrderedSet::new();
    scan_dtb(&dtb, &index, &mut modules, &mut firmware).unwrap();

    assert_eq!(modules.iter().collect::<Vec<_>>(), ["chipdrv", "paneldrv"]);
    assert_eq!(
        firmware.iter().collect::<Vec<_>>(),
        ["/lib/firmware/acme/panel.fw"]
    );
}

#[test]
fn full_pipeline_to_report() {
    let mut index = FakeIndex::default();
    index
        .aliases
        .insert("of:N*T*Cvendor,chip".into(), vec!["chipdrv".into()]);
    index.info.insert(
        "chipdrv".into(),
        vec![
            ("license".into(), "GPL".into()),
            ("firmware".into(), "chip/fw.bin".into()),
        ],
    );

    let dtb_dir = TempDir::new().unwrap();
    let blob = Dtb::default()
        .begin("")
        .begin("chip@0")
        .prop("compatible", b"vendor,chip\0")
        .end()
        .begin("splash")
        .prop("firmware-name", b"boot/splash.bin\0")
        .end()
        .end()
        .bytes();
    let dtb = write_dtb(&dtb_dir, "board.dtb", &blob);

    let mut modules = OrderedSet::new();
    let mut firmware = OrderedSet::new();
    scan_dtb(&dtb, &index, &mut modules, &mut firmware).unwrap();
    expand_firmware(&modules, &index, &mut firmware);

    let mut out = Vec::new();
    write_report(&mut out, &modules, &firmware).unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "MODULES=(\n\
         \x20   chipdrv\n\
         )\n\
         \n\
         FILES=(\n\
         \x20   /lib/firmware/boot/splash.bin\n\
         \x20   /lib/firmware/chip/fw.bin\n\
         )\n"
    );
}

#[test]
fn one_bad_file_does_not_poison_the_batch() {
    let mut index = FakeIndex::default();
    index
        .aliases
        .insert("of:N*T*Cvendor,chip".into(), vec!["chipdrv".into()]);
    index
        .aliases
        .insert("of:N*T*Cvendor,other".into(), vec!["otherdrv".into()]);

    let dtb_dir = TempDir::new().unwrap();
    let good_a = write_dtb(
        &dtb_dir,
        "a.dtb",
        &Dtb::default()
            .begin("")
            .begin("chip")
            .prop("compatible", b"vendor,chip\0")
            .end()
            .end()
            .bytes(),
    );
    let good_b = write_dtb(
        &dtb_dir,
        "b.dtb",
        &Dtb::default()
            .begin("")
            .begin("other")
            .prop("compatible", b"vendor,other\0")
            .end()
            .end()
            .bytes(),
    );
    let missing = dtb_dir.path().join("missing.dtb");

    let mut modules = OrderedSet::new();
    let mut firmware = OrderedSet::new();
    let mut failures = 0;
    for path in [&good_a, &missing, &good_b] {
        match scan_dtb(path, &index, &mut modules, &mut firmware) {
            Ok(()) => {}
            Err(ScanError::Io { .. }) => failures += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(failures, 1);
    assert_eq!(modules.iter().collect::<Vec<_>>(), ["chipdrv", "otherdrv"]);
}
