// either half can be absent on its own
pub struct OsVersionPatchLevel {
    pub os_version: Option<String>,
    pub os_patch_level: Option<String>,
}

// 21 version bits, 11 patch level bits
pub fn decode_os_version_patch_level(word: u32) -> OsVersionPatchLevel {
    OsVersionPatchLevel {
        os_version: format_os_version(word >> 11),
        os_patch_level: format_os_patch_level(word & 0x7FF),
    }
}

// 7 bits each for major.minor.patch
fn format_os_version(bits: u32) -> Option<String> {
    if bits == 0 {
        return None;
    }
    let a = bits >> 14;
    let b = (bits >> 7) & 0x7F;
    let c = bits & 0x7F;
    Some(format!("{}.{}.{}", a, b, c))
}

// 7 bits for the year since 2000, 4 for the month
fn format_os_patch_level(bits: u32) -> Option<String> {
    if bits == 0 {
        return None;
    }
    let year = (bits >> 4) + 2000;
    let month = bits & 0x0F;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(format!("{:04}-{:02}", year, month))
}
