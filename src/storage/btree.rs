//! Node layout: a set of total, side-effect-free accessors that treat a
//! 4096-byte page buffer as a typed record via fixed offsets.
//!
//! There is no allocation here and no heterogeneous record type with
//! compiler-chosen padding — every field lives at a named offset inside the
//! page, and these functions are the only thing allowed to know where.
//!
//! | Property           | Internal node                  | Leaf node            |
//! |--------------------|---------------------------------|-----------------------|
//! | Stores             | keys and pointers to children   | keys and rows         |
//! | Key purpose         | routing                        | paired with a row      |

use super::pager::PAGE_SIZE;
use super::row::ROW_SIZE;
use crate::errors::Error;

pub type Page = [u8; PAGE_SIZE];

/// First header byte: which layout the rest of the page follows. `0` is
/// internal, `1` is leaf — the reverse of what you might expect, but this
/// matches the on-disk convention the rest of this codebase keys off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

// --- Common node header -----------------------------------------------

const NODE_TYPE_OFFSET: usize = 0;
const NODE_TYPE_SIZE: usize = 1;
const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
const IS_ROOT_SIZE: usize = 1;
const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
const PARENT_POINTER_SIZE: usize = 4;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// --- Leaf node header ----------------------------------------------------

const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
const LEAF_NODE_NEXT_LEAF_SIZE: usize = 4;
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

// --- Leaf node body ----------------------------------------------------

const LEAF_NODE_KEY_SIZE: usize = 4;
const LEAF_NODE_KEY_OFFSET: usize = 0;
const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + ROW_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

/// Cells assigned to the new (right) leaf on a split.
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
/// Cells left behind in the old (left) leaf on a split.
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize =
    (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// --- Internal node header ----------------------------------------------

const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

// --- Internal node body --------------------------------------------------

const INTERNAL_NODE_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_KEY_SIZE: usize = 4;
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
pub const INTERNAL_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_MAX_CELLS: usize = INTERNAL_NODE_SPACE_FOR_CELLS / INTERNAL_NODE_CELL_SIZE;

fn field(buf: &[u8; PAGE_SIZE], offset: usize, size: usize) -> &[u8] {
    &buf[offset..offset + size]
}

fn field_mut(buf: &mut [u8; PAGE_SIZE], offset: usize, size: usize) -> &mut [u8] {
    &mut buf[offset..offset + size]
}

// --- Common header accessors --------------------------------------------

pub fn node_type(buf: &Page) -> Result<NodeType, Error> {
    match buf[NODE_TYPE_OFFSET] {
        0 => Ok(NodeType::Internal),
        1 => Ok(NodeType::Leaf),
        other => Err(err!(Storage, "invalid node type byte: {}", other)),
    }
}

pub fn set_node_type(buf: &mut Page, node_type: NodeType) {
    buf[NODE_TYPE_OFFSET] = match node_type {
        NodeType::Internal => 0,
        NodeType::Leaf => 1,
    };
}

pub fn is_node_root(buf: &Page) -> bool {
    buf[IS_ROOT_OFFSET] == 1
}

pub fn set_node_root(buf: &mut Page, is_root: bool) {
    buf[IS_ROOT_OFFSET] = is_root as u8;
}

pub fn parent_page_num(buf: &Page) -> u32 {
    read_u32(field(buf, PARENT_POINTER_OFFSET, PARENT_POINTER_SIZE))
}

pub fn set_parent_page_num(buf: &mut Page, parent: u32) {
    field_mut(buf, PARENT_POINTER_OFFSET, PARENT_POINTER_SIZE).copy_from_slice(&parent.to_le_bytes());
}

/// For a leaf, the key at `num_cells - 1`; for an internal, the key at
/// `num_keys - 1`. Only meaningful on a non-empty node.
pub fn node_max_key(buf: &Page) -> Result<u32, Error> {
    match node_type(buf)? {
        NodeType::Leaf => {
            let n = leaf_node_num_cells(buf);
            if n == 0 {
                return Err(err!(Integrity, "max key requested on empty leaf"));
            }
            Ok(leaf_node_key(buf, (n - 1) as usize))
        }
        NodeType::Internal => {
            let n = internal_node_num_keys(buf);
            if n == 0 {
                return Err(err!(Integrity, "max key requested on empty internal node"));
            }
            Ok(internal_node_key(buf, n - 1))
        }
    }
}

// --- Leaf accessors -------------------------------------------------------

pub fn initialize_leaf_node(buf: &mut Page) {
    set_node_type(buf, NodeType::Leaf);
    set_node_root(buf, false);
    set_leaf_node_num_cells(buf, 0);
    set_leaf_node_next_leaf(buf, 0);
}

pub fn leaf_node_num_cells(buf: &Page) -> u32 {
    read_u32(field(buf, LEAF_NODE_NUM_CELLS_OFFSET, LEAF_NODE_NUM_CELLS_SIZE))
}

pub fn set_leaf_node_num_cells(buf: &mut Page, num: u32) {
    field_mut(buf, LEAF_NODE_NUM_CELLS_OFFSET, LEAF_NODE_NUM_CELLS_SIZE)
        .copy_from_slice(&num.to_le_bytes());
}

pub fn leaf_node_next_leaf(buf: &Page) -> u32 {
    read_u32(field(buf, LEAF_NODE_NEXT_LEAF_OFFSET, LEAF_NODE_NEXT_LEAF_SIZE))
}

pub fn set_leaf_node_next_leaf(buf: &mut Page, next: u32) {
    field_mut(buf, LEAF_NODE_NEXT_LEAF_OFFSET, LEAF_NODE_NEXT_LEAF_SIZE)
        .copy_from_slice(&next.to_le_bytes());
}

fn leaf_cell_offset(cell_num: usize) -> usize {
    LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE
}

pub fn leaf_node_key(buf: &Page, cell_num: usize) -> u32 {
    let offset = leaf_cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET;
    read_u32(&buf[offset..offset + LEAF_NODE_KEY_SIZE])
}

pub fn set_leaf_node_key(buf: &mut Page, cell_num: usize, key: u32) {
    let offset = leaf_cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET;
    buf[offset..offset + LEAF_NODE_KEY_SIZE].copy_from_slice(&key.to_le_bytes());
}

pub fn leaf_node_value(buf: &Page, cell_num: usize) -> &[u8] {
    let offset = leaf_cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET;
    &buf[offset..offset + ROW_SIZE]
}

pub fn set_leaf_node_value(buf: &mut Page, cell_num: usize, value: &[u8]) {
    let offset = leaf_cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET;
    buf[offset..offset + ROW_SIZE].copy_from_slice(value);
}

/// Copies cell `src` onto cell `dst` wholesale (key and row image).
pub fn copy_leaf_cell(buf: &mut Page, src: usize, dst: usize) {
    let src_off = leaf_cell_offset(src);
    let dst_off = leaf_cell_offset(dst);
    let mut tmp = [0u8; LEAF_NODE_CELL_SIZE];
    tmp.copy_from_slice(&buf[src_off..src_off + LEAF_NODE_CELL_SIZE]);
    buf[dst_off..dst_off + LEAF_NODE_CELL_SIZE].copy_from_slice(&tmp);
}

// --- Internal accessors ---------------------------------------------------

pub fn initialize_internal_node(buf: &mut Page) {
    set_node_type(buf, NodeType::Internal);
    set_node_root(buf, false);
    set_internal_node_num_keys(buf, 0);
}

pub fn internal_node_num_keys(buf: &Page) -> u32 {
    read_u32(field(buf, INTERNAL_NODE_NUM_KEYS_OFFSET, INTERNAL_NODE_NUM_KEYS_SIZE))
}

pub fn set_internal_node_num_keys(buf: &mut Page, num: u32) {
    field_mut(buf, INTERNAL_NODE_NUM_KEYS_OFFSET, INTERNAL_NODE_NUM_KEYS_SIZE)
        .copy_from_slice(&num.to_le_bytes());
}

pub fn internal_node_right_child(buf: &Page) -> u32 {
    read_u32(field(buf, INTERNAL_NODE_RIGHT_CHILD_OFFSET, INTERNAL_NODE_RIGHT_CHILD_SIZE))
}

pub fn set_internal_node_right_child(buf: &mut Page, child: u32) {
    field_mut(buf, INTERNAL_NODE_RIGHT_CHILD_OFFSET, INTERNAL_NODE_RIGHT_CHILD_SIZE)
        .copy_from_slice(&child.to_le_bytes());
}

fn internal_cell_offset(cell_num: usize) -> usize {
    INTERNAL_NODE_HEADER_SIZE + cell_num * INTERNAL_NODE_CELL_SIZE
}

pub fn internal_node_child(buf: &Page, child_num: u32) -> u32 {
    let num_keys = internal_node_num_keys(buf);
    if child_num == num_keys {
        internal_node_right_child(buf)
    } else {
        let offset = internal_cell_offset(child_num as usize);
        read_u32(&buf[offset..offset + INTERNAL_NODE_CHILD_SIZE])
    }
}

pub fn set_internal_node_child(buf: &mut Page, child_num: u32, child_page: u32) {
    let num_keys = internal_node_num_keys(buf);
    if child_num == num_keys {
        set_internal_node_right_child(buf, child_page);
    } else {
        let offset = internal_cell_offset(child_num as usize);
        buf[offset..offset + INTERNAL_NODE_CHILD_SIZE].copy_from_slice(&child_page.to_le_bytes());
    }
}

pub fn internal_node_key(buf: &Page, key_num: u32) -> u32 {
    let offset = internal_cell_offset(key_num as usize) + INTERNAL_NODE_CHILD_SIZE;
    read_u32(&buf[offset..offset + INTERNAL_NODE_KEY_SIZE])
}

pub fn set_internal_node_key(buf: &mut Page, key_num: u32, key: u32) {
    let offset = internal_cell_offset(key_num as usize) + INTERNAL_NODE_CHILD_SIZE;
    buf[offset..offset + INTERNAL_NODE_KEY_SIZE].copy_from_slice(&key.to_le_bytes());
}

/// Copies a whole internal cell (child pointer + key) from `src` to `dst`.
pub fn copy_internal_cell(buf: &mut Page, src: usize, dst: usize) {
    let src_off = internal_cell_offset(src);
    let dst_off = internal_cell_offset(dst);
    let mut tmp = [0u8; INTERNAL_NODE_CELL_SIZE];
    tmp.copy_from_slice(&buf[src_off..src_off + INTERNAL_NODE_CELL_SIZE]);
    buf[dst_off..dst_off + INTERNAL_NODE_CELL_SIZE].copy_from_slice(&tmp);
}

/// Classic binary search over the *n* keys, returning the smallest index
/// `i` such that `key <= key_i`, or `n` if `key` exceeds every key (meaning
/// "descend via `right_child`").
pub fn internal_find_child(buf: &Page, key: u32) -> u32 {
    let num_keys = internal_node_num_keys(buf);
    let mut lo = 0u32;
    let mut hi = num_keys;
    while lo != hi {
        let mid = lo + (hi - lo) / 2;
        if internal_node_key(buf, mid) >= key {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes.try_into().expect("fixed-size field slice"))
}
