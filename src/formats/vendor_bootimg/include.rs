use binrw::BinRead;

use crate::utils::common;

#[derive(BinRead, Debug)]
pub struct VendorBootHeader {
    magic_bytes: [u8; 8],
    pub header_version: u32,
    pub page_size: u32,
    pub kernel_load_address: u32,
    pub ramdisk_load_address: u32,
    pub vendor_ramdisk_size: u32,
    cmdline_bytes: [u8; 2048],
    pub tags_load_address: u32,
    product_name_bytes: [u8; 16],
    pub header_size: u32,
    pub dtb_size: u32,
    pub dtb_load_address: u64,
}

impl VendorBootHeader {
    pub fn boot_magic(&self) -> String {
        common::string_from_bytes(&self.magic_bytes)
    }
    pub fn cmdline(&self) -> String {
        common::string_from_bytes(&self.cmdline_bytes)
    }
    pub fn product_name(&self) -> String {
        common::string_from_bytes(&self.product_name_bytes)
    }
}

// fields version 4 appends after the base header
#[derive(BinRead, Debug)]
pub struct VendorBootHeaderV4 {
    pub vendor_ramdisk_table_size: u32,
    pub vendor_ramdisk_table_entry_num: u32,
    pub vendor_ramdisk_table_entry_size: u32,
    pub vendor_bootconfig_size: u32,
}

// offsets are relative to the start of the ramdisk region, not the file
#[derive(BinRead, Debug)]
pub struct RamdiskTableEntry {
    pub ramdisk_size: u32,
    pub ramdisk_offset: u32,
    pub ramdisk_type: u32,
    ramdisk_name_bytes: [u8; 32],
    pub board_id: [u32; 4],
}

impl RamdiskTableEntry {
    pub fn name(&self) -> String {
        common::string_from_bytes(&self.ramdisk_name_bytes)
    }

    pub fn type_name(&self) -> &'static str {
        match self.ramdisk_type {
            1 => "platform",
            2 => "recovery",
            3 => "dlkm",
            _ => "none",
        }
    }
}
