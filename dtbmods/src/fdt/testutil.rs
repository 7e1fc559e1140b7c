//! Tiny DTB builder for unit tests.
//!
//! Assembles a structurally valid version-17 blob from begin/prop/end
//! calls, enough to exercise the reader without shipping binary fixtures.

const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_END: u32 = 0x9;

#[derive(Default)]
pub struct DtbBuilder {
    structure: Vec<u8>,
    strings: Vec<u8>,
}

impl DtbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_node(mut self, name: &str) -> Self {
        self.structure.extend_from_slice(&FDT_BEGIN_NODE.to_be_bytes());
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self
    }

    pub fn end_node(mut self) -> Self {
        self.structure.extend_from_slice(&FDT_END_NODE.to_be_bytes());
        self
    }

    pub fn prop(mut self, name: &str, value: &[u8]) -> Self {
        let name_off = self.intern(name);
        self.structure.extend_from_slice(&FDT_PROP.to_be_bytes());
        self.structure
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.structure.extend_from_slice(&name_off.to_be_bytes());
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.structure.extend_from_slice(&FDT_END.to_be_bytes());

        let header_size = 40usize;
        let rsvmap_size = 16usize; // one all-zero terminator entry
        let off_struct = header_size + rsvmap_size;
        let off_strings = off_struct + self.structure.len();
        let totalsize = off_strings + self.strings.len();

        let mut blob = Vec::with_capacity(totalsize);
        blob.extend_from_slice(&FDT_MAGIC.to_be_bytes());
        blob.extend_from_slice(&(totalsize as u32).to_be_bytes());
        blob.extend_from_slice(&(off_struct as u32).to_be_bytes());
        blob.extend_from_slice(&(off_strings as u32).to_be_bytes());
        blob.extend_from_slice(&(header_size as u32).to_be_bytes()); // off_mem_rsvmap
        blob.extend_from_slice(&17u32.to_be_bytes()); // version
        blob.extend_from_slice(&16u32.to_be_bytes()); // last_comp_version
        blob.extend_from_slice(&0u32.to_be_bytes()); // boot_cpuid_phys
        blob.extend_from_slice(&(self.strings.len() as u32).to_be_bytes());
        blob.extend_from_slice(&(self.structure.len() as u32).to_be_bytes());
        blob.extend_from_slice(&[0u8; 16]);
        blob.extend_from_slice(&self.structure);
        blob.extend_from_slice(&self.strings);
        blob
    }

    fn intern(&mut self, name: &str) -> u32 {
        let needle = name.as_bytes();
        let mut start = 0;
        while start < self.strings.len() {
            let end = start
                + self.strings[start..]
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(self.strings.len() - start);
            if &self.strings[start..end] == needle {
                return start as u32;
            }
            start = end + 1;
        }
        let off = self.strings.len() as u32;
        self.strings.extend_from_slice(needle);
        self.strings.push(0);
        off
    }

    fn pad(&mut self) {
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
    }
}
