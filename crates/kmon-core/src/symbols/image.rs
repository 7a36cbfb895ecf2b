//! ELF image helpers shared by the DWARF resolver and the kernel layout.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use object::{Object, ObjectSection, ObjectSegment};

use crate::error::{KmonError, KmonResult};

pub(crate) const PAGE_SIZE: u64 = 4096;

/// DWARF sections handed to gimli, with the names they may appear under.
pub(crate) const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev"]),
    (".debug_addr", &[".debug_addr"]),
    (".debug_info", &[".debug_info"]),
    (".debug_line", &[".debug_line"]),
    (".debug_line_str", &[".debug_line_str"]),
    (".debug_ranges", &[".debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists"]),
    (".debug_str", &[".debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets"]),
    (".debug_types", &[".debug_types"]),
    (".debug_loc", &[".debug_loc"]),
    (".debug_loclists", &[".debug_loclists"]),
];

/// Read an image from disk.
pub fn read(path: &Path) -> KmonResult<Vec<u8>>
{
    Ok(fs::read(path)?)
}

/// Parse image bytes, naming `path` in the error.
pub(crate) fn parse<'data>(path: &Path, data: &'data [u8]) -> KmonResult<object::File<'data>>
{
    object::File::parse(data).map_err(|err| KmonError::ImageParse(format!("{}: {err}", path.display())))
}

/// Lowest loadable address of the image, rounded down to a page.
///
/// This is the address the loader maps at the image's base, so it is what the
/// first mapping of the file in `/proc/self/maps` corresponds to.
pub(crate) fn image_base(file: &object::File<'_>) -> u64
{
    file.segments()
        .map(|segment| segment.address())
        .min()
        .unwrap_or(0)
        & !(PAGE_SIZE - 1)
}

/// Half-open range of file addresses covered by loadable segments.
pub(crate) fn image_range(file: &object::File<'_>) -> (u64, u64)
{
    let mut low = u64::MAX;
    let mut high = 0;
    for segment in file.segments() {
        let start = segment.address();
        low = low.min(start);
        high = high.max(start.saturating_add(segment.size()));
    }
    if low > high {
        (0, 0)
    } else {
        (low, high)
    }
}

pub(crate) fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> KmonResult<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section
                .uncompressed_data()
                .map_err(|err| KmonError::Dwarf(format!("failed to read {name}: {err}")))?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }

    Ok(Arc::<[u8]>::from(Vec::new()))
}

/// Load bias of an image mapped into the current process.
///
/// `runtime address = file address + bias`. Zero for position-dependent
/// executables, the randomised base for PIE ones.
///
/// ## Errors
///
/// - `Unsupported` off Linux
/// - `InvalidArgument` if `path` is not mapped into this process
pub fn process_bias(path: &Path, file: &object::File<'_>) -> KmonResult<u64>
{
    let mapped = mapped_base(path)?;
    Ok(mapped.wrapping_sub(image_base(file)))
}

#[cfg(target_os = "linux")]
fn mapped_base(path: &Path) -> KmonResult<u64>
{
    let target = path.canonicalize()?;
    let maps = fs::read_to_string("/proc/self/maps")?;

    maps.lines()
        .filter_map(|line| {
            // start-end perms offset dev inode pathname
            let mut fields = line.split_whitespace();
            let range = fields.next()?;
            let pathname = fields.nth(4)?;
            if Path::new(pathname) != target {
                return None;
            }
            let (start, _) = range.split_once('-')?;
            u64::from_str_radix(start, 16).ok()
        })
        .min()
        .ok_or_else(|| KmonError::InvalidArgument(format!("{} is not mapped into this process", target.display())))
}

#[cfg(not(target_os = "linux"))]
fn mapped_base(_path: &Path) -> KmonResult<u64>
{
    Err(KmonError::Unsupported("load bias lookup needs /proc/self/maps".into()))
}
