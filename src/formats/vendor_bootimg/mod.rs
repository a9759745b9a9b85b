pub mod include;

use std::fmt;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use binrw::BinReaderExt;

use crate::errors::UnpackError;
use crate::utils::common;
use crate::utils::extract::{self, ImageEntry};
use include::*;

pub const VENDOR_BOOT_MAGIC: &[u8; 8] = b"VNDRBOOT";

#[derive(Debug)]
pub struct VendorBootImageInfo {
    pub header: VendorBootHeader,
    pub table_info: Option<VendorBootHeaderV4>,
    pub vendor_ramdisk_table: Vec<RamdiskTableEntry>,
    pub image_dir: PathBuf,
}

fn fragment_name(index: usize) -> String {
    format!("vendor_ramdisk{:02}", index)
}

// ramdisk slots are mandatory, they are written even at size zero
pub fn unpack_vendor_boot_image<R: Read + Seek>(
    input: &mut R,
    output_dir: &Path,
) -> Result<VendorBootImageInfo, UnpackError> {
    let header: VendorBootHeader = input
        .read_le()
        .map_err(|_| UnpackError::truncated("header information"))?;

    let table_info: Option<VendorBootHeaderV4> = if header.header_version > 3 {
        Some(
            input
                .read_le()
                .map_err(|_| UnpackError::truncated("ramdisk table"))?,
        )
    } else {
        None
    };

    let page_size = u64::from(header.page_size);
    let num_header_pages = u64::from(common::number_of_pages(header.header_size, header.page_size));
    let num_ramdisk_pages = u64::from(common::number_of_pages(
        header.vendor_ramdisk_size,
        header.page_size,
    ));
    let num_dtb_pages = u64::from(common::number_of_pages(header.dtb_size, header.page_size));
    let ramdisk_offset_base = page_size * num_header_pages;

    let mut image_entries = Vec::new();
    let mut vendor_ramdisk_table = Vec::new();

    if let Some(ext) = &table_info {
        // the table itself sits after the ramdisk region and the dtb
        let table_offset = page_size * (num_header_pages + num_ramdisk_pages + num_dtb_pages);

        for i in 0..ext.vendor_ramdisk_table_entry_num {
            let entry_offset =
                table_offset + u64::from(ext.vendor_ramdisk_table_entry_size) * u64::from(i);
            input
                .seek(SeekFrom::Start(entry_offset))
                .map_err(|_| UnpackError::truncated(format!("ramdisk table entry {}", i)))?;

            let entry: RamdiskTableEntry = input
                .read_le()
                .map_err(|_| UnpackError::truncated(format!("ramdisk table entry {}", i)))?;

            image_entries.push(ImageEntry::new(
                ramdisk_offset_base + u64::from(entry.ramdisk_offset),
                entry.ramdisk_size,
                &fragment_name(i as usize),
            ));
            vendor_ramdisk_table.push(entry);
        }

        let table_pages = u64::from(common::number_of_pages(
            ext.vendor_ramdisk_table_size,
            header.page_size,
        ));
        image_entries.push(ImageEntry::new(
            table_offset + page_size * table_pages,
            ext.vendor_bootconfig_size,
            "bootconfig",
        ));
    } else {
        image_entries.push(ImageEntry::new(
            ramdisk_offset_base,
            header.vendor_ramdisk_size,
            "vendor_ramdisk",
        ));
    }

    if header.dtb_size > 0 {
        image_entries.push(ImageEntry::new(
            page_size * (num_header_pages + num_ramdisk_pages),
            header.dtb_size,
            "dtb",
        ));
    }

    fs::create_dir_all(output_dir).map_err(|e| UnpackError::CreateOutputDir {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    for entry in &image_entries {
        extract::extract_image(input, entry, output_dir)?;
    }

    let symlinks: Vec<(String, String)> = vendor_ramdisk_table
        .iter()
        .enumerate()
        .filter(|(_, entry)| !entry.name().is_empty())
        .map(|(index, entry)| (fragment_name(index), entry.name()))
        .collect();
    if !symlinks.is_empty() {
        extract::create_ramdisk_symlinks(output_dir, &symlinks);
    }

    Ok(VendorBootImageInfo {
        header,
        table_info,
        vendor_ramdisk_table,
        image_dir: output_dir.to_path_buf(),
    })
}

impl VendorBootImageInfo {
    pub fn mkbootimg_arguments(&self) -> Vec<String> {
        let header = &self.header;
        let mut args = Vec::new();
        let mut add_arg = |option: &str, value: String| {
            args.push(option.to_string());
            args.push(value);
        };

        add_arg("--header_version", header.header_version.to_string());
        add_arg("--pagesize", format!("0x{:x}", header.page_size));
        add_arg("--base", "0x0".to_string());
        add_arg("--kernel_offset", format!("0x{:x}", header.kernel_load_address));
        add_arg(
            "--ramdisk_offset",
            format!("0x{:x}", header.ramdisk_load_address),
        );
        add_arg("--tags_offset", format!("0x{:x}", header.tags_load_address));
        add_arg("--dtb_offset", format!("0x{:x}", header.dtb_load_address));

        if !header.cmdline().is_empty() {
            add_arg("--vendor_cmdline", header.cmdline());
        }
        if !header.product_name().is_empty() {
            add_arg("--board", header.product_name());
        }
        if header.dtb_size > 0 {
            add_arg("--dtb", self.image_dir.join("dtb").display().to_string());
        }

        if header.header_version > 3 {
            add_arg(
                "--vendor_bootconfig",
                self.image_dir.join("bootconfig").display().to_string(),
            );

            for (index, entry) in self.vendor_ramdisk_table.iter().enumerate() {
                let fragment_path = self
                    .image_dir
                    .join(fragment_name(index))
                    .display()
                    .to_string();

                // nameless fragments can only be fed back as a plain ramdisk
                if entry.name().is_empty() {
                    add_arg("--vendor_ramdisk", fragment_path);
                    continue;
                }
                add_arg("--ramdisk_type", entry.type_name().to_string());
                add_arg("--ramdisk_name", entry.name());
                add_arg("--vendor_ramdisk_fragment", fragment_path);
            }
        } else {
            add_arg(
                "--vendor_ramdisk",
                self.image_dir.join("vendor_ramdisk").display().to_string(),
            );
        }

        args
    }
}

impl fmt::Display for VendorBootImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.header;

        writeln!(f, "boot magic: {}", header.boot_magic())?;
        writeln!(f, "vendor boot image header version: {}", header.header_version)?;
        writeln!(f, "page size: {}", header.page_size)?;
        writeln!(f, "kernel load address: 0x{:x}", header.kernel_load_address)?;
        writeln!(f, "ramdisk load address: 0x{:x}", header.ramdisk_load_address)?;
        if header.header_version > 3 {
            writeln!(f, "vendor ramdisk total size: {}", header.vendor_ramdisk_size)?;
        } else {
            writeln!(f, "vendor ramdisk size: {}", header.vendor_ramdisk_size)?;
        }
        writeln!(f, "vendor command line args: {}", header.cmdline())?;
        writeln!(f, "kernel tags load address: 0x{:x}", header.tags_load_address)?;
        writeln!(f, "product name: {}", header.product_name())?;
        writeln!(f, "vendor boot image header size: {}", header.header_size)?;
        writeln!(f, "dtb size: {}", header.dtb_size)?;
        writeln!(f, "dtb address: 0x{:x}", header.dtb_load_address)?;

        if let Some(ext) = &self.table_info {
            writeln!(f, "vendor ramdisk table size: {}", ext.vendor_ramdisk_table_size)?;
            writeln!(f, "vendor ramdisk table:")?;
            writeln!(f, "[")?;
            for (index, entry) in self.vendor_ramdisk_table.iter().enumerate() {
                writeln!(f, "    {}: {{", fragment_name(index))?;
                writeln!(f, "        size: {}", entry.ramdisk_size)?;
                writeln!(f, "        offset: {}", entry.ramdisk_offset)?;
                writeln!(f, "        type: {}", entry.type_name())?;
                writeln!(f, "        name: {}", entry.name())?;
                writeln!(f, "        board_id: [")?;
                write!(f, "            ")?;
                for id in &entry.board_id {
                    write!(f, "0x{:x}, ", id)?;
                }
                writeln!(f)?;
                writeln!(f, "        ]")?;
                writeln!(f, "    }}")?;
            }
            writeln!(f, "]")?;
            writeln!(f, "vendor bootconfig size: {}", ext.vendor_bootconfig_size)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    const PAGE_SIZE: u32 = 2048;

    struct SeekRecorder {
        inner: Cursor<Vec<u8>>,
        seeks: Vec<u64>,
    }

    impl Read for SeekRecorder {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for SeekRecorder {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            if let SeekFrom::Start(target) = pos {
                self.seeks.push(target);
            }
            self.inner.seek(pos)
        }
    }

    fn put_u32(buf: &mut Vec<u8>, value: u32) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u64(buf: &mut Vec<u8>, value: u64) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn put_padded(buf: &mut Vec<u8>, data: &[u8], size: usize) {
        let start = buf.len();
        buf.extend_from_slice(data);
        buf.resize(start + size, 0);
    }

    fn vendor_header(version: u32, vendor_ramdisk_size: u32, dtb_size: u32, header_size: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(VENDOR_BOOT_MAGIC);
        put_u32(&mut buf, version);
        put_u32(&mut buf, PAGE_SIZE);
        put_u32(&mut buf, 0x10008000);
        put_u32(&mut buf, 0x11000000);
        put_u32(&mut buf, vendor_ramdisk_size);
        put_padded(&mut buf, b"androidboot.hardware=qcom", 2048);
        put_u32(&mut buf, 0x10000100);
        put_padded(&mut buf, b"raven", 16);
        put_u32(&mut buf, header_size);
        put_u32(&mut buf, dtb_size);
        put_u64(&mut buf, 0x13000000);
        buf
    }

    fn put_entry(buf: &mut Vec<u8>, size: u32, offset: u32, ramdisk_type: u32, name: &[u8]) {
        put_u32(buf, size);
        put_u32(buf, offset);
        put_u32(buf, ramdisk_type);
        put_padded(buf, name, 32);
        for id in [0xAA, 0xBB, 0, 0] {
            put_u32(buf, id);
        }
        // slot padding past the known fields, must be skipped over
        put_u32(buf, 0xDEAD_BEEF);
    }

    // header 2 pages, ramdisk region 2 pages, dtb 1 page, table 1 page:
    // fragments at 4096, dtb at 8192, table at 10240, bootconfig at 12288
    fn v4_image() -> Vec<u8> {
        let mut image = vendor_header(4, 3000, 1000, 2128);
        put_u32(&mut image, 192); // table size
        put_u32(&mut image, 3); // entry count
        put_u32(&mut image, 64); // entry size
        put_u32(&mut image, 100); // bootconfig size
        image.resize(12388, 0);

        image[4096..5096].fill(0x01);
        image[5096..6596].fill(0x02);
        image[6596..7096].fill(0x03);
        image[8192..9192].fill(0x0D);
        image[12288..12388].fill(0x0C);

        let mut table = Vec::new();
        put_entry(&mut table, 1000, 0, 1, b"init_boot");
        put_entry(&mut table, 1500, 1000, 2, b"");
        put_entry(&mut table, 500, 2500, 99, b"dlkm_foo");
        image[10240..10240 + table.len()].copy_from_slice(&table);

        image
    }

    #[test]
    fn unpacks_v4_fragments_bootconfig_and_dtb() {
        let dir = tempfile::tempdir().unwrap();
        let info = unpack_vendor_boot_image(&mut Cursor::new(v4_image()), dir.path()).unwrap();

        assert_eq!(info.header.boot_magic(), "VNDRBOOT");
        assert_eq!(info.header.header_version, 4);
        assert_eq!(info.header.page_size, 2048);
        assert_eq!(info.header.vendor_ramdisk_size, 3000);
        assert_eq!(info.header.cmdline(), "androidboot.hardware=qcom");
        assert_eq!(info.header.product_name(), "raven");
        assert_eq!(info.header.header_size, 2128);
        assert_eq!(info.header.dtb_size, 1000);

        let ext = info.table_info.as_ref().unwrap();
        assert_eq!(ext.vendor_ramdisk_table_entry_num, 3);
        assert_eq!(ext.vendor_bootconfig_size, 100);

        assert_eq!(
            fs::read(dir.path().join("vendor_ramdisk00")).unwrap(),
            vec![0x01; 1000]
        );
        assert_eq!(
            fs::read(dir.path().join("vendor_ramdisk01")).unwrap(),
            vec![0x02; 1500]
        );
        assert_eq!(
            fs::read(dir.path().join("vendor_ramdisk02")).unwrap(),
            vec![0x03; 500]
        );
        assert_eq!(fs::read(dir.path().join("bootconfig")).unwrap(), vec![0x0C; 100]);
        assert_eq!(fs::read(dir.path().join("dtb")).unwrap(), vec![0x0D; 1000]);
    }

    #[test]
    fn each_table_entry_gets_its_own_seek() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = SeekRecorder {
            inner: Cursor::new(v4_image()),
            seeks: Vec::new(),
        };
        unpack_vendor_boot_image(&mut input, dir.path()).unwrap();

        // only the entry slot seeks land inside the table region
        let entry_seeks: Vec<u64> = input
            .seeks
            .iter()
            .copied()
            .filter(|s| (10240..10432).contains(s))
            .collect();
        assert_eq!(entry_seeks, vec![10240, 10304, 10368]);
    }

    #[test]
    fn decodes_table_entries_honoring_entry_size() {
        let dir = tempfile::tempdir().unwrap();
        let info = unpack_vendor_boot_image(&mut Cursor::new(v4_image()), dir.path()).unwrap();

        let names: Vec<String> = info.vendor_ramdisk_table.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["init_boot", "", "dlkm_foo"]);

        let types: Vec<&str> = info
            .vendor_ramdisk_table
            .iter()
            .map(|e| e.type_name())
            .collect();
        assert_eq!(types, vec!["platform", "recovery", "none"]);

        let entry = &info.vendor_ramdisk_table[2];
        assert_eq!(entry.ramdisk_size, 500);
        assert_eq!(entry.ramdisk_offset, 2500);
        assert_eq!(entry.board_id, [0xAA, 0xBB, 0, 0]);
    }

    #[cfg(unix)]
    #[test]
    fn named_fragments_get_symlinks_nameless_do_not() {
        let dir = tempfile::tempdir().unwrap();
        unpack_vendor_boot_image(&mut Cursor::new(v4_image()), dir.path()).unwrap();

        let symlink_dir = dir.path().join("vendor-ramdisk-by-name");
        assert_eq!(
            fs::read(symlink_dir.join("ramdisk_init_boot")).unwrap(),
            vec![0x01; 1000]
        );
        assert_eq!(
            fs::read(symlink_dir.join("ramdisk_dlkm_foo")).unwrap(),
            vec![0x03; 500]
        );
        // the empty-name fragment was extracted but not linked
        assert_eq!(fs::read_dir(&symlink_dir).unwrap().count(), 2);
    }

    #[test]
    fn unpacks_v3_single_ramdisk() {
        let mut image = vendor_header(3, 2000, 0, 2112);
        image.resize(6096, 0);
        image[4096..6096].fill(0x44);

        let dir = tempfile::tempdir().unwrap();
        let info = unpack_vendor_boot_image(&mut Cursor::new(image), dir.path()).unwrap();

        assert_eq!(info.header.header_version, 3);
        assert!(info.table_info.is_none());
        assert!(info.vendor_ramdisk_table.is_empty());

        assert_eq!(
            fs::read(dir.path().join("vendor_ramdisk")).unwrap(),
            vec![0x44; 2000]
        );
        assert!(!dir.path().join("bootconfig").exists());
        assert!(!dir.path().join("dtb").exists());
        assert!(!dir.path().join("vendor-ramdisk-by-name").exists());
    }

    #[test]
    fn v3_zero_sized_ramdisk_still_produces_a_file() {
        let mut image = vendor_header(3, 0, 0, 2112);
        image.resize(4096, 0);

        let dir = tempfile::tempdir().unwrap();
        unpack_vendor_boot_image(&mut Cursor::new(image), dir.path()).unwrap();

        assert_eq!(fs::read(dir.path().join("vendor_ramdisk")).unwrap(), b"");
    }

    #[test]
    fn truncated_header_is_reported() {
        let image = vendor_header(3, 0, 0, 2112);
        match unpack_vendor_boot_image(
            &mut Cursor::new(image[..100].to_vec()),
            Path::new("never-created"),
        )
        .unwrap_err()
        {
            UnpackError::TruncatedInput(field) => assert_eq!(field, "header information"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn v4_without_table_fields_is_reported() {
        // a version 4 header cut off right where the table fields begin
        let image = vendor_header(4, 0, 0, 2128);
        match unpack_vendor_boot_image(&mut Cursor::new(image), Path::new("never-created"))
            .unwrap_err()
        {
            UnpackError::TruncatedInput(field) => assert_eq!(field, "ramdisk table"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn v4_mkbootimg_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let mut info = unpack_vendor_boot_image(&mut Cursor::new(v4_image()), dir.path()).unwrap();
        info.image_dir = PathBuf::from("out");

        let expected: Vec<&str> = vec![
            "--header_version",
            "4",
            "--pagesize",
            "0x800",
            "--base",
            "0x0",
            "--kernel_offset",
            "0x10008000",
            "--ramdisk_offset",
            "0x11000000",
            "--tags_offset",
            "0x10000100",
            "--dtb_offset",
            "0x13000000",
            "--vendor_cmdline",
            "androidboot.hardware=qcom",
            "--board",
            "raven",
            "--dtb",
            "out/dtb",
            "--vendor_bootconfig",
            "out/bootconfig",
            "--ramdisk_type",
            "platform",
            "--ramdisk_name",
            "init_boot",
            "--vendor_ramdisk_fragment",
            "out/vendor_ramdisk00",
            "--vendor_ramdisk",
            "out/vendor_ramdisk01",
            "--ramdisk_type",
            "none",
            "--ramdisk_name",
            "dlkm_foo",
            "--vendor_ramdisk_fragment",
            "out/vendor_ramdisk02",
        ];
        assert_eq!(info.mkbootimg_arguments(), expected);
    }

    #[test]
    fn v3_mkbootimg_arguments() {
        let mut image = vendor_header(3, 2000, 0, 2112);
        image.resize(6096, 0);

        let dir = tempfile::tempdir().unwrap();
        let mut info = unpack_vendor_boot_image(&mut Cursor::new(image), dir.path()).unwrap();
        info.image_dir = PathBuf::from("out");

        let expected: Vec<&str> = vec![
            "--header_version",
            "3",
            "--pagesize",
            "0x800",
            "--base",
            "0x0",
            "--kernel_offset",
            "0x10008000",
            "--ramdisk_offset",
            "0x11000000",
            "--tags_offset",
            "0x10000100",
            "--dtb_offset",
            "0x13000000",
            "--vendor_cmdline",
            "androidboot.hardware=qcom",
            "--board",
            "raven",
            "--vendor_ramdisk",
            "out/vendor_ramdisk",
        ];
        assert_eq!(info.mkbootimg_arguments(), expected);
    }

    #[test]
    fn v4_pretty_text_renders_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let info = unpack_vendor_boot_image(&mut Cursor::new(v4_image()), dir.path()).unwrap();

        let expected = concat!(
            "boot magic: VNDRBOOT\n",
            "vendor boot image header version: 4\n",
            "page size: 2048\n",
            "kernel load address: 0x10008000\n",
            "ramdisk load address: 0x11000000\n",
            "vendor ramdisk total size: 3000\n",
            "vendor command line args: androidboot.hardware=qcom\n",
            "kernel tags load address: 0x10000100\n",
            "product name: raven\n",
            "vendor boot image header size: 2128\n",
            "dtb size: 1000\n",
            "dtb address: 0x13000000\n",
            "vendor ramdisk table size: 192\n",
            "vendor ramdisk table:\n",
            "[\n",
            "    vendor_ramdisk00: {\n",
            "        size: 1000\n",
            "        offset: 0\n",
            "        type: platform\n",
            "        name: init_boot\n",
            "        board_id: [\n",
            "            0xaa, 0xbb, 0x0, 0x0, \n",
            "        ]\n",
            "    }\n",
            "    vendor_ramdisk01: {\n",
            "        size: 1500\n",
            "        offset: 1000\n",
            "        type: recovery\n",
            "        name: \n",
            "        board_id: [\n",
            "            0xaa, 0xbb, 0x0, 0x0, \n",
            "        ]\n",
            "    }\n",
            "    vendor_ramdisk02: {\n",
            "        size: 500\n",
            "        offset: 2500\n",
            "        type: none\n",
            "        name: dlkm_foo\n",
            "        board_id: [\n",
            "            0xaa, 0xbb, 0x0, 0x0, \n",
            "        ]\n",
            "    }\n",
            "]\n",
            "vendor bootconfig size: 100\n",
        );
        assert_eq!(info.to_string(), expected);
    }

    #[test]
    fn v3_pretty_text_has_no_table_block() {
        let mut image = vendor_header(3, 2000, 0, 2112);
        image.resize(6096, 0);

        let dir = tempfile::tempdir().unwrap();
        let info = unpack_vendor_boot_image(&mut Cursor::new(image), dir.path()).unwrap();
        let text = info.to_string();

        assert!(text.contains("vendor ramdisk size: 2000\n"));
        assert!(!text.contains("vendor ramdisk total size"));
        assert!(!text.contains("vendor ramdisk table"));
        assert!(!text.contains("vendor bootconfig size"));
    }
}
