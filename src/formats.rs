use std::fmt;

use crate::formats::bootimg::BootImageInfo;
use crate::formats::vendor_bootimg::VendorBootImageInfo;

pub mod bootimg;
pub mod vendor_bootimg;

pub enum UnpackedImage {
    Boot(BootImageInfo),
    VendorBoot(VendorBootImageInfo),
}

impl UnpackedImage {
    pub fn mkbootimg_arguments(&self) -> Vec<String> {
        match self {
            UnpackedImage::Boot(info) => info.mkbootimg_arguments(),
            UnpackedImage::VendorBoot(info) => info.mkbootimg_arguments(),
        }
    }
}

impl fmt::Display for UnpackedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnpackedImage::Boot(info) => write!(f, "{}", info),
            UnpackedImage::VendorBoot(info) => write!(f, "{}", info),
        }
    }
}
