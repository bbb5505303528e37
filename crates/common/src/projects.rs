//! Browser projects, one per device class

use serde::{Deserialize, Serialize};

use crate::filter::{DeviceClass, GrepPattern, TestFilterBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A named browser project and the tests it selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProject {
    /// Project name as the test runner knows it
    pub name: &'static str,

    /// Emulated device descriptor
    pub device: &'static str,

    pub device_class: DeviceClass,

    /// Viewport override, if the device default is not used
    pub viewport: Option<Viewport>,

    pub grep: GrepPattern,
}

/// Derive the desktop, mobile and tablet projects from a shared builder.
///
/// Each project extends `builder` with its own device-class predicate.
pub fn device_projects(builder: &TestFilterBuilder) -> Vec<DeviceProject> {
    vec![
        DeviceProject {
            name: "chromium",
            device: "Desktop Chrome",
            device_class: DeviceClass::Desktop,
            viewport: Some(Viewport { width: 1920, height: 1080 }),
            grep: builder.with_device_class(DeviceClass::Desktop).build(),
        },
        DeviceProject {
            name: "mobile",
            device: "iPhone 15 Pro",
            device_class: DeviceClass::Mobile,
            viewport: None,
            grep: builder.with_device_class(DeviceClass::Mobile).build(),
        },
        DeviceProject {
            name: "tablet-large",
            device: "iPad Pro 11",
            device_class: DeviceClass::Tablet,
            viewport: None,
            grep: builder.with_device_class(DeviceClass::Tablet).build(),
        },
    ]
}
