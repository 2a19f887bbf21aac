//! Address-ordered collection of files for one connection side, with
//! automatic address assignment for locally created files.
//!
//! Grounded on `apx/src/file_map.c`: `auto_assign_address` picks a start
//! address and alignment per file type, finds the last-assigned file
//! sharing that type's region, and rounds its end address up to the next
//! aligned boundary (or uses the region's start address if none exists
//! yet). `insert_item` then rejects placements that would cross the
//! reserved command area or overlap the next file already in the map.
//!
//! One deviation from the original: its `find_last_element_of_type` scopes
//! the "last file" search to an exact `apx_fileType_t` match rather than to
//! the shared region, so a `ProvidePortData` file and a `RequirePortData`
//! file placed on the same map both compute the region's start address and
//! collide. Since the two types share a region precisely so they pack
//! consecutively, this crate scopes the search by region instead.

use std::collections::BTreeMap;

use crate::error::{ApxError, Result};
use crate::file::{File, FileInfo};
use crate::rmf::CMD_AREA_START_ADDRESS;
use crate::types::ApxFileType;

fn region(file_type: ApxFileType) -> (u32, u32) {
    match file_type {
        ApxFileType::Definition => (0x0400_0000, 0x0004_0000),
        ApxFileType::ProvidePortCount | ApxFileType::RequirePortCount => (0x0800_0000, 0x0000_0400),
        ApxFileType::ProvidePortData | ApxFileType::RequirePortData => (0x0000_0000, 0x0000_0400),
        ApxFileType::UserDefined => (0x2000_0000, 0x0000_1000),
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (value + (align - 1)) & !(align - 1)
}

/// Address-ordered set of files belonging to one side of a connection.
#[derive(Debug, Default)]
pub struct FileMap {
    files: BTreeMap<u32, File>,
}

impl FileMap {
    pub fn new() -> Self {
        Self { files: BTreeMap::new() }
    }

    /// Compute the next address for a new file of `file_type` and `size`,
    /// without inserting it.
    ///
    /// `ProvidePortData` and `RequirePortData` share one region (same start
    /// address and alignment) so that a node's "out" and "in" files pack
    /// back to back instead of both landing on the region's start address;
    /// the "last file already placed" search below is scoped to that shared
    /// region rather than to the exact file type for those two types.
    pub fn auto_assign_address(&self, file_type: ApxFileType, size: u32) -> Result<u32> {
        let (start, align) = region(file_type);
        let last_end = self
            .files
            .values()
            .filter(|f| region(file_type_of(f)) == (start, align))
            .map(|f| f.end_address())
            .max();
        let address = match last_end {
            Some(end) => align_up(end, align),
            None => start,
        };
        self.check_placement(address, size)?;
        Ok(address)
    }

    /// Insert `file` at its already-assigned address, validating placement.
    pub fn insert(&mut self, file: File) -> Result<()> {
        self.check_placement(file.address(), file.info.size)?;
        self.files.insert(file.address(), file);
        Ok(())
    }

    fn check_placement(&self, address: u32, size: u32) -> Result<()> {
        let end = address.checked_add(size).ok_or(ApxError::InvalidAddress)?;
        if end > CMD_AREA_START_ADDRESS {
            return Err(ApxError::InvalidAddress);
        }
        if let Some((&next_addr, _)) = self.files.range(address..).next() {
            if next_addr < end && next_addr != address {
                return Err(ApxError::FileAlreadyExists);
            }
        }
        if self.files.contains_key(&address) {
            return Err(ApxError::FileAlreadyExists);
        }
        Ok(())
    }

    pub fn remove(&mut self, address: u32) -> Option<File> {
        self.files.remove(&address)
    }

    pub fn get(&self, address: u32) -> Option<&File> {
        self.files.get(&address)
    }

    pub fn get_mut(&mut self, address: u32) -> Option<&mut File> {
        self.files.get_mut(&address)
    }

    /// Find the file whose `[address, address+size)` range contains `addr`,
    /// used to resolve an inbound data write to its owning file.
    pub fn find_containing(&self, addr: u32) -> Option<&File> {
        self.files
            .range(..=addr)
            .next_back()
            .map(|(_, f)| f)
            .filter(|f| addr < f.end_address())
    }

    pub fn iter(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    pub fn publish(&mut self, info: FileInfo, owner: crate::file::file::FileOwner) -> Result<u32> {
        let address = info.address;
        self.insert(File::new(info, owner))?;
        Ok(address)
    }
}

fn file_type_of(file: &File) -> ApxFileType {
    // The file's extension round-trips to its ApxFileType; files created
    // through `auto_assign_address` always carry one of these suffixes.
    match file.info.name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("apx") => ApxFileType::Definition,
        Some("out") => ApxFileType::ProvidePortData,
        Some("in") => ApxFileType::RequirePortData,
        Some("cout") => ApxFileType::ProvidePortCount,
        Some("cin") => ApxFileType::RequirePortCount,
        _ => ApxFileType::UserDefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::file::FileOwner;
    use crate::types::RmfFileType;

    fn file_at(address: u32, size: u32, name: &str) -> File {
        File::new(FileInfo::new(address, size, name, RmfFileType::Fixed), FileOwner::Local)
    }

    #[test]
    fn first_definition_file_gets_region_start() {
        let map = FileMap::new();
        let addr = map.auto_assign_address(ApxFileType::Definition, 256).unwrap();
        assert_eq!(addr, 0x0400_0000);
    }

    #[test]
    fn three_unaddressed_definition_files_auto_assign_in_sequence() {
        let mut map = FileMap::new();
        let a = map.auto_assign_address(ApxFileType::Definition, 100).unwrap();
        map.insert(file_at(a, 100, "A.apx")).unwrap();
        let b = map.auto_assign_address(ApxFileType::Definition, 200).unwrap();
        map.insert(file_at(b, 200, "B.apx")).unwrap();
        let c = map.auto_assign_address(ApxFileType::Definition, 300).unwrap();
        map.insert(file_at(c, 300, "C.apx")).unwrap();
        assert_eq!((a, b, c), (0x0400_0000, 0x0404_0000, 0x0408_0000));
    }

    #[test]
    fn second_definition_file_is_aligned_past_the_first() {
        let mut map = FileMap::new();
        map.insert(file_at(0x0400_0000, 100, "A.apx")).unwrap();
        let addr = map.auto_assign_address(ApxFileType::Definition, 50).unwrap();
        assert_eq!(addr, 0x0404_0000);
    }

    #[test]
    fn port_data_and_count_regions_are_independent() {
        let mut map = FileMap::new();
        map.insert(file_at(0x0, 16, "A.out")).unwrap();
        let data_addr = map.auto_assign_address(ApxFileType::ProvidePortData, 16).unwrap();
        let count_addr = map.auto_assign_address(ApxFileType::ProvidePortCount, 4).unwrap();
        assert_eq!(data_addr, 0x400);
        assert_eq!(count_addr, 0x0800_0000);
    }

    #[test]
    fn provide_and_require_port_data_pack_consecutively() {
        let mut map = FileMap::new();
        let provide_addr = map.auto_assign_address(ApxFileType::ProvidePortData, 4).unwrap();
        map.insert(file_at(provide_addr, 4, "TestNode.out")).unwrap();
        let require_addr = map.auto_assign_address(ApxFileType::RequirePortData, 5).unwrap();
        assert_eq!(provide_addr, 0x0);
        assert_eq!(require_addr, 0x400);
    }

    #[test]
    fn overlapping_insert_rejected() {
        let mut map = FileMap::new();
        map.insert(file_at(0x1000, 32, "A.out")).unwrap();
        let overlapping = file_at(0x1010, 32, "B.out");
        assert_eq!(map.insert(overlapping), Err(ApxError::FileAlreadyExists));
    }

    #[test]
    fn crossing_command_area_rejected() {
        let mut map = FileMap::new();
        let huge = file_at(CMD_AREA_START_ADDRESS - 10, 32, "A.user");
        assert_eq!(map.insert(huge), Err(ApxError::InvalidAddress));
    }

    #[test]
    fn find_containing_resolves_write_address_to_file() {
        let mut map = FileMap::new();
        map.insert(file_at(0x2000, 64, "A.out")).unwrap();
        let found = map.find_containing(0x2020).unwrap();
        assert_eq!(found.address(), 0x2000);
        assert!(map.find_containing(0x2040 + 64).is_none());
    }
}
