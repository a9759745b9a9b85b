use std::fmt;
use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use crate::errors::UnpackError;
use crate::utils::common;
use crate::utils::extract::{self, ImageEntry};
use crate::utils::os_version;

pub const BOOT_MAGIC: &[u8; 8] = b"ANDROID!";

const BOARDNAME_SIZE: usize = 16;
const CMDLINE_SIZE: usize = 512;
const EXTRA_CMDLINE_SIZE: usize = 1024;
// v3 and newer carry one combined cmdline field
const EXTENDED_CMDLINE_SIZE: usize = CMDLINE_SIZE + EXTRA_CMDLINE_SIZE;
const SHA_LENGTH: usize = 32;
const V3_PAGE_SIZE: u32 = 4096;

// fields a version does not carry stay zero or empty
#[derive(Debug, Default)]
pub struct BootImageInfo {
    pub boot_magic: String,
    pub header_version: u32,
    pub page_size: u32,
    pub kernel_size: u32,
    pub kernel_load_address: u32,
    pub ramdisk_size: u32,
    pub ramdisk_load_address: u32,
    pub second_size: u32,
    pub second_load_address: u32,
    pub tags_load_address: u32,
    pub os_version: Option<String>,
    pub os_patch_level: Option<String>,
    pub product_name: String,
    pub cmdline: String,
    pub extra_cmdline: String,
    pub recovery_dtbo_size: u32,
    pub recovery_dtbo_offset: u64,
    pub boot_header_size: u32,
    pub dtb_size: u32,
    pub dtb_load_address: u64,
    pub boot_signature_size: u32,
    pub image_dir: PathBuf,
}

// the first nine words are shared by every version; what they mean and what
// follows depends on the version found in the last of them
pub fn read_header<R: Read + Seek>(input: &mut R) -> Result<BootImageInfo, UnpackError> {
    let mut info = BootImageInfo::default();

    info.boot_magic = common::read_string(input, BOOT_MAGIC.len(), "boot magic")?;

    let mut words = [0u32; 9];
    for word in &mut words {
        *word = common::read_u32(input, "header information")?;
    }

    info.header_version = words[8];
    info.page_size = if info.header_version < 3 {
        words[7]
    } else {
        V3_PAGE_SIZE
    };

    let os_version_word;
    if info.header_version < 3 {
        info.kernel_size = words[0];
        info.kernel_load_address = words[1];
        info.ramdisk_size = words[2];
        info.ramdisk_load_address = words[3];
        info.second_size = words[4];
        info.second_load_address = words[5];
        info.tags_load_address = words[6];

        os_version_word = common::read_u32(input, "os version/patch level")?;
    } else {
        info.kernel_size = words[0];
        info.ramdisk_size = words[1];
        os_version_word = words[2];
    }

    let decoded = os_version::decode_os_version_patch_level(os_version_word);
    info.os_version = decoded.os_version;
    info.os_patch_level = decoded.os_patch_level;

    if info.header_version < 3 {
        info.product_name = common::read_string(input, BOARDNAME_SIZE, "board name")?;
        info.cmdline = common::read_string(input, CMDLINE_SIZE, "boot cmdline")?;

        // 32 byte digest region, never validated
        common::skip(input, SHA_LENGTH, "SHA-1 checksum")?;

        info.extra_cmdline =
            common::read_string(input, EXTRA_CMDLINE_SIZE, "boot extra cmdline")?;
    } else {
        info.cmdline = common::read_string(input, EXTENDED_CMDLINE_SIZE, "boot cmdline")?;
    }

    if info.header_version == 1 || info.header_version == 2 {
        info.recovery_dtbo_size = common::read_u32(input, "recovery_dtbo_size")?;
        info.recovery_dtbo_offset = common::read_u64(input, "recovery_dtbo_offset")?;
        info.boot_header_size = common::read_u32(input, "boot_header_size")?;
    }

    if info.header_version == 2 {
        info.dtb_size = common::read_u32(input, "dtb_size")?;
        info.dtb_load_address = common::read_u64(input, "dtb_load_address")?;
    }

    if info.header_version >= 4 {
        info.boot_signature_size = common::read_u32(input, "boot_signature_size")?;
    }

    Ok(info)
}

// header occupies one page, segments follow page aligned, except the
// recovery dtbo which records its own absolute offset
fn image_entries(info: &BootImageInfo, emit_empty_ramdisk: bool) -> Vec<ImageEntry> {
    let page_size = u64::from(info.page_size);
    let num_header_pages = 1u64;
    let num_kernel_pages = u64::from(common::number_of_pages(info.kernel_size, info.page_size));
    let num_ramdisk_pages = u64::from(common::number_of_pages(info.ramdisk_size, info.page_size));
    let num_second_pages = u64::from(common::number_of_pages(info.second_size, info.page_size));
    let num_recovery_dtbo_pages =
        u64::from(common::number_of_pages(info.recovery_dtbo_size, info.page_size));

    let mut entries = Vec::new();

    if info.kernel_size > 0 {
        entries.push(ImageEntry::new(
            page_size * num_header_pages,
            info.kernel_size,
            "kernel",
        ));
    }

    if info.ramdisk_size > 0 || emit_empty_ramdisk {
        entries.push(ImageEntry::new(
            page_size * (num_header_pages + num_kernel_pages),
            info.ramdisk_size,
            "ramdisk",
        ));
    }

    if info.second_size > 0 {
        entries.push(ImageEntry::new(
            page_size * (num_header_pages + num_kernel_pages + num_ramdisk_pages),
            info.second_size,
            "second",
        ));
    }

    if info.recovery_dtbo_size > 0 {
        entries.push(ImageEntry::new(
            info.recovery_dtbo_offset,
            info.recovery_dtbo_size,
            "recovery_dtbo",
        ));
    }

    if info.dtb_size > 0 {
        entries.push(ImageEntry::new(
            page_size
                * (num_header_pages
                    + num_kernel_pages
                    + num_ramdisk_pages
                    + num_second_pages
                    + num_recovery_dtbo_pages),
            info.dtb_size,
            "dtb",
        ));
    }

    if info.boot_signature_size > 0 {
        entries.push(ImageEntry::new(
            page_size * (num_header_pages + num_kernel_pages + num_ramdisk_pages),
            info.boot_signature_size,
            "boot_signature",
        ));
    }

    entries
}

// output directory only appears once the header decoded cleanly
pub fn unpack_boot_image<R: Read + Seek>(
    input: &mut R,
    output_dir: &Path,
) -> Result<BootImageInfo, UnpackError> {
    let mut info = read_header(input)?;

    fs::create_dir_all(output_dir).map_err(|e| UnpackError::CreateOutputDir {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    for entry in image_entries(&info, false) {
        extract::extract_image(input, &entry, output_dir)?;
    }

    info.image_dir = output_dir.to_path_buf();
    Ok(info)
}

impl BootImageInfo {
    pub fn mkbootimg_arguments(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut add_arg = |option: &str, value: String| {
            args.push(option.to_string());
            args.push(value);
        };

        add_arg("--header_version", self.header_version.to_string());

        if let Some(os_version) = &self.os_version {
            add_arg("--os_version", os_version.clone());
        }
        if let Some(os_patch_level) = &self.os_patch_level {
            add_arg("--os_patch_level", os_patch_level.clone());
        }

        if self.kernel_size > 0 {
            add_arg("--kernel", self.image_dir.join("kernel").display().to_string());
        }
        if self.ramdisk_size > 0 {
            add_arg("--ramdisk", self.image_dir.join("ramdisk").display().to_string());
        }

        if self.header_version == 2 && self.dtb_size > 0 {
            add_arg("--dtb", self.image_dir.join("dtb").display().to_string());
        }

        if self.header_version <= 2 {
            if self.second_size > 0 {
                add_arg("--second", self.image_dir.join("second").display().to_string());
            }
            if self.recovery_dtbo_size > 0 {
                add_arg(
                    "--recovery_dtbo",
                    self.image_dir.join("recovery_dtbo").display().to_string(),
                );
            }

            add_arg("--pagesize", self.page_size.to_string());
            add_arg("--base", "0x0".to_string());
            add_arg("--kernel_offset", format!("0x{:x}", self.kernel_load_address));
            add_arg("--ramdisk_offset", format!("0x{:x}", self.ramdisk_load_address));
            if self.header_version == 2 {
                add_arg("--dtb_offset", format!("0x{:x}", self.dtb_load_address));
            }

            add_arg("--board", self.product_name.clone());
            add_arg("--cmdline", format!("{}{}", self.cmdline, self.extra_cmdline));
        } else {
            add_arg("--cmdline", self.cmdline.clone());
        }

        args
    }
}

impl fmt::Display for BootImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "boot magic: {}", self.boot_magic)?;

        if self.header_version < 3 {
            writeln!(f, "kernel_size: {}", self.kernel_size)?;
            writeln!(f, "kernel load address: 0x{:x}", self.kernel_load_address)?;
            writeln!(f, "ramdisk size: {}", self.ramdisk_size)?;
            writeln!(f, "ramdisk load address: 0x{:x}", self.ramdisk_load_address)?;
            writeln!(f, "second bootloader size: {}", self.second_size)?;
            writeln!(
                f,
                "second bootloader load address: 0x{:x}",
                self.second_load_address
            )?;
            writeln!(f, "kernel tags load address: 0x{:x}", self.tags_load_address)?;
        }

        writeln!(f, "page size: {}", self.page_size)?;
        writeln!(f, "os version: {}", self.os_version.as_deref().unwrap_or(""))?;
        writeln!(
            f,
            "os patch level: {}",
            self.os_patch_level.as_deref().unwrap_or("")
        )?;
        writeln!(f, "boot image header version: {}", self.header_version)?;

        if self.header_version < 3 {
            writeln!(f, "product name: {}", self.product_name)?;
        }

        writeln!(f, "command line args: {}", self.cmdline)?;

        if self.header_version < 3 {
            writeln!(f, "additional command line args: {}", self.extra_cmdline)?;
        }

        if self.header_version == 1 || self.header_version == 2 {
            writeln!(f, "recovery dtbo size: {}", self.recovery_dtbo_size)?;
            writeln!(f, "recovery dtbo offset: 0x{:x}", self.recovery_dtbo_offset)?;
            writeln!(f, "boot header size: {}", self.boot_header_size)?;
        }

        if self.header_version == 2 {
            writeln!(f, "dtb size: {}", self.dtb_size)?;
            writeln!(f, "dtb address: 0x{:x}", self.dtb_load_address)?;
        }

        if self.header_version >= 4 {
            writeln!(f, "boot.img signature size: {}", self.boot_signature_size)?;
        }

        Ok(())
    }
}
