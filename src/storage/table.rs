//! Table ties a [`Pager`] to a fixed root page and hosts the tree
//! operations that compose the node codec, the cursor, and the pager:
//! `find`, `leaf_insert`, `leaf_split_and_insert`, `create_new_root`,
//! `internal_insert`, `update_internal_key`.

use super::btree::{self, NodeType, Page};
use super::cursor::Cursor;
use super::pager::{Pager, PAGE_SIZE};
use super::row::Row;
use crate::errors::{Error, UserError};
use std::path::Path;
use tracing::{debug, info, trace};

pub use super::btree::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
pub use super::row::ROW_SIZE;

pub struct Table {
    pub pager: Pager,
    pub root_page_num: u32,
}

impl Table {
    /// Opens `path`, materializing and initializing page 0 as the root leaf
    /// if the file is brand new.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Table, Error> {
        Self::open_with_max_pages(path, super::pager::MAX_PAGES)
    }

    /// Opens `path` with a configured page-cache ceiling (clamped to never
    /// exceed [`super::pager::MAX_PAGES`]). See [`Pager::open_with_max_pages`].
    pub fn open_with_max_pages<P: AsRef<Path>>(path: P, max_pages: usize) -> Result<Table, Error> {
        let mut pager = Pager::open_with_max_pages(path, max_pages)?;
        let root_page_num = 0;

        if pager.num_pages() == 0 {
            let root = pager.get_page(0)?;
            btree::initialize_leaf_node(root);
            btree::set_node_root(root, true);
            info!("initialized new table with an empty root leaf");
        }

        Ok(Table {
            pager,
            root_page_num,
        })
    }

    /// Flushes every materialized page and closes the file.
    pub fn close(&mut self) -> Result<(), Error> {
        self.pager.close()
    }

    /// Inserts `row` keyed by `row.id`, rejecting a duplicate key before any
    /// structural mutation happens.
    pub fn insert(&mut self, row: &Row) -> Result<(), Error> {
        let key = row.id;

        let (page_num, cell_num) = {
            let cursor = Cursor::find(self, key)?;
            (cursor.page_num, cursor.cell_num)
        };

        let num_cells = btree::leaf_node_num_cells(self.pager.get_page(page_num)?);
        if cell_num < num_cells
            && btree::leaf_node_key(self.pager.get_page(page_num)?, cell_num as usize) == key
        {
            return Err(Error::User(UserError::DuplicateKey));
        }

        self.leaf_insert(page_num, cell_num, key, row)
    }

    /// Collects every row in ascending key order.
    pub fn select_rows(&mut self) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::new();
        let mut cursor = Cursor::start(self)?;
        while !cursor.end_of_table {
            rows.push(Row::deserialize(&cursor.value()?)?);
            cursor.advance()?;
        }
        Ok(rows)
    }

    fn leaf_insert(&mut self, page_num: u32, cell_num: u32, key: u32, row: &Row) -> Result<(), Error> {
        let num_cells = btree::leaf_node_num_cells(self.pager.get_page(page_num)?);

        if (num_cells as usize) < LEAF_NODE_MAX_CELLS {
            let serialized = row.serialize();
            let page = self.pager.get_page(page_num)?;

            let mut i = num_cells;
            while i > cell_num {
                btree::copy_leaf_cell(page, (i - 1) as usize, i as usize);
                i -= 1;
            }

            btree::set_leaf_node_key(page, cell_num as usize, key);
            btree::set_leaf_node_value(page, cell_num as usize, &serialized);
            btree::set_leaf_node_num_cells(page, num_cells + 1);
            trace!(page_num, cell_num, key, "leaf insert without split");
            Ok(())
        } else {
            self.leaf_split_and_insert(page_num, cell_num, key, row)
        }
    }

    /// Splits a full leaf 7/7, redistributing every existing cell plus the
    /// new one by walking positions `LEAF_NODE_MAX_CELLS..=0` in descending
    /// order, then promotes a new root or links into the parent internal
    /// node.
    fn leaf_split_and_insert(
        &mut self,
        old_page_num: u32,
        cell_num: u32,
        key: u32,
        row: &Row,
    ) -> Result<(), Error> {
        debug!(old_page_num, "splitting full leaf");

        let mut old_buf: Page = *self.pager.get_page(old_page_num)?;
        let old_max = btree::node_max_key(&old_buf)?;
        let was_root = btree::is_node_root(&old_buf);
        let parent_page_num = btree::parent_page_num(&old_buf);

        let new_page_num = self.pager.unused_page_num();
        let mut new_buf: Page = [0u8; PAGE_SIZE];
        btree::initialize_leaf_node(&mut new_buf);
        btree::set_parent_page_num(&mut new_buf, parent_page_num);
        btree::set_leaf_node_next_leaf(&mut new_buf, btree::leaf_node_next_leaf(&old_buf));
        btree::set_leaf_node_next_leaf(&mut old_buf, new_page_num);

        let serialized = row.serialize();
        const LEFT: usize = btree::LEAF_NODE_LEFT_SPLIT_COUNT;
        const RIGHT: usize = btree::LEAF_NODE_RIGHT_SPLIT_COUNT;

        for i in (0..=LEAF_NODE_MAX_CELLS).rev() {
            let local_index = i % LEFT;

            let (cell_key, cell_value): (u32, Vec<u8>) = if i == cell_num as usize {
                (key, serialized.to_vec())
            } else {
                let source_index = if i > cell_num as usize { i - 1 } else { i };
                (
                    btree::leaf_node_key(&old_buf, source_index),
                    btree::leaf_node_value(&old_buf, source_index).to_vec(),
                )
            };

            let destination: &mut Page = if i >= LEFT { &mut new_buf } else { &mut old_buf };
            btree::set_leaf_node_key(destination, local_index, cell_key);
            btree::set_leaf_node_value(destination, local_index, &cell_value);
        }

        btree::set_leaf_node_num_cells(&mut old_buf, LEFT as u32);
        btree::set_leaf_node_num_cells(&mut new_buf, RIGHT as u32);

        *self.pager.get_page(old_page_num)? = old_buf;
        *self.pager.get_page(new_page_num)? = new_buf;

        if was_root {
            self.create_new_root(new_page_num)
        } else {
            let new_max_of_old = btree::node_max_key(&old_buf)?;
            self.update_internal_key(parent_page_num, old_max, new_max_of_old)?;
            self.internal_insert(parent_page_num, new_page_num)
        }
    }

    /// Promotes the current root (leaf or internal) into a fresh left child
    /// and reinitializes the root page in place as an internal node with
    /// that left child and `right_child_page` as its two children.
    fn create_new_root(&mut self, right_child_page: u32) -> Result<(), Error> {
        let left_page_num = self.pager.unused_page_num();
        let mut left_buf: Page = *self.pager.get_page(self.root_page_num)?;
        btree::set_node_root(&mut left_buf, false);
        *self.pager.get_page(left_page_num)? = left_buf;

        let left_max_key = btree::node_max_key(&left_buf)?;

        let mut root_buf: Page = [0u8; PAGE_SIZE];
        btree::initialize_internal_node(&mut root_buf);
        btree::set_node_root(&mut root_buf, true);
        btree::set_internal_node_num_keys(&mut root_buf, 1);
        btree::set_internal_node_child(&mut root_buf, 0, left_page_num);
        btree::set_internal_node_key(&mut root_buf, 0, left_max_key);
        btree::set_internal_node_right_child(&mut root_buf, right_child_page);

        *self.pager.get_page(self.root_page_num)? = root_buf;

        let root_page_num = self.root_page_num;
        btree::set_parent_page_num(self.pager.get_page(left_page_num)?, root_page_num);
        btree::set_parent_page_num(self.pager.get_page(right_child_page)?, root_page_num);

        info!(root_page_num, left_page_num, right_child_page, "promoted root to internal node");
        Ok(())
    }

    /// Inserts `child_page_num` into `parent_page_num`'s cell array in key
    /// order. Internal-node splitting is intentionally unimplemented: an
    /// overflow here is fatal.
    fn internal_insert(&mut self, parent_page_num: u32, child_page_num: u32) -> Result<(), Error> {
        let child_max = btree::node_max_key(self.pager.get_page(child_page_num)?)?;

        let mut parent_buf: Page = *self.pager.get_page(parent_page_num)?;
        let original_num_keys = btree::internal_node_num_keys(&parent_buf);

        if original_num_keys as usize >= btree::INTERNAL_NODE_MAX_CELLS {
            return Err(err!(
                Capacity,
                "internal node {} is full; splitting internal nodes is not supported",
                parent_page_num
            ));
        }

        let index = btree::internal_find_child(&parent_buf, child_max);
        btree::set_internal_node_num_keys(&mut parent_buf, original_num_keys + 1);

        let right_child_page_num = btree::internal_node_right_child(&parent_buf);
        let right_child_max = btree::node_max_key(self.pager.get_page(right_child_page_num)?)?;

        if child_max > right_child_max {
            btree::set_internal_node_child(&mut parent_buf, original_num_keys, right_child_page_num);
            btree::set_internal_node_key(&mut parent_buf, original_num_keys, right_child_max);
            btree::set_internal_node_right_child(&mut parent_buf, child_page_num);
        } else {
            let mut i = original_num_keys;
            while i > index {
                btree::copy_internal_cell(&mut parent_buf, (i - 1) as usize, i as usize);
                i -= 1;
            }
            btree::set_internal_node_child(&mut parent_buf, index, child_page_num);
            btree::set_internal_node_key(&mut parent_buf, index, child_max);
        }

        *self.pager.get_page(parent_page_num)? = parent_buf;
        btree::set_parent_page_num(self.pager.get_page(child_page_num)?, parent_page_num);

        trace!(parent_page_num, child_page_num, "internal insert");
        Ok(())
    }

    /// Finds the child keyed by `old_key` and overwrites its key with
    /// `new_key`. Called after a leaf split changes that leaf's max key.
    fn update_internal_key(&mut self, node_page_num: u32, old_key: u32, new_key: u32) -> Result<(), Error> {
        let mut buf: Page = *self.pager.get_page(node_page_num)?;
        let index = btree::internal_find_child(&buf, old_key);
        btree::set_internal_node_key(&mut buf, index, new_key);
        *self.pager.get_page(node_page_num)? = buf;
        Ok(())
    }

    /// Renders the tree via the recursive `.btree` dump format: `- leaf
    /// (size N)` / `- internal (size N)`, with `- key` lines for internal
    /// children and `level` leading spaces per nesting depth.
    ///
    /// The root's own header line prints one space deeper than its nominal
    /// `level`; every other line (a child's header, its cells, and `- key`
    /// lines) follows `level` exactly as recursed.
    pub fn format_tree(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        let root_page_num = self.root_page_num;
        self.format_node(root_page_num, 0, true, &mut out)?;
        Ok(out)
    }

    fn format_node(&mut self, page_num: u32, level: usize, is_root: bool, out: &mut String) -> Result<(), Error> {
        let buf: Page = *self.pager.get_page(page_num)?;
        let header_level = if is_root { level + 1 } else { level };
        let indent = " ".repeat(header_level);
        let child_indent = " ".repeat(level + 1);

        match btree::node_type(&buf)? {
            NodeType::Leaf => {
                let num_cells = btree::leaf_node_num_cells(&buf);
                out.push_str(&format!("{}- leaf (size {})\n", indent, num_cells));
                for i in 0..num_cells {
                    out.push_str(&format!("{}- {}\n", child_indent, btree::leaf_node_key(&buf, i as usize)));
                }
            }
            NodeType::Internal => {
                let num_keys = btree::internal_node_num_keys(&buf);
                out.push_str(&format!("{}- internal (size {})\n", indent, num_keys));
                for i in 0..num_keys {
                    let child = btree::internal_node_child(&buf, i);
                    self.format_node(child, level + 1, false, out)?;
                    out.push_str(&format!("{}- key {}\n", child_indent, btree::internal_node_key(&buf, i)));
                }
                let right_child = btree::internal_node_right_child(&buf);
                self.format_node(right_child, level + 1, false, out)?;
            }
        }
        Ok(())
    }

    /// Renders the `.constants` dump: 25-wide right-justified names, `: `,
    /// 5-wide right-justified values.
    pub fn format_constants() -> String {
        let mut out = String::new();
        for (name, value) in [
            ("ROW_SIZE", ROW_SIZE),
            ("COMMON_NODE_HEADER_SIZE", COMMON_NODE_HEADER_SIZE),
            ("LEAF_NODE_HEADER_SIZE", LEAF_NODE_HEADER_SIZE),
            ("LEAF_NODE_CELL_SIZE", LEAF_NODE_CELL_SIZE),
            ("LEAF_NODE_SPACE_FOR_CELLS", LEAF_NODE_SPACE_FOR_CELLS),
            ("LEAF_NODE_MAX_CELLS", LEAF_NODE_MAX_CELLS),
        ] {
            out.push_str(&format!("{:>25}: {:>5}\n", name, value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u32) -> Row {
        Row::new(id, &format!("user{id}"), &format!("user{id}@example.com")).unwrap()
    }

    #[test]
    fn open_on_fresh_file_initializes_a_root_leaf() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        assert_eq!(table.select_rows().unwrap(), vec![]);
    }

    #[test]
    fn insert_then_select_returns_rows_in_key_order() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        for id in [3, 1, 2] {
            table.insert(&row(id)).unwrap();
        }
        let ids: Vec<u32> = table.select_rows().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        table.insert(&row(1)).unwrap();
        let err = table.insert(&row(1)).unwrap_err();
        assert!(matches!(err, Error::User(UserError::DuplicateKey)));
    }

    #[test]
    fn fourteen_reverse_inserts_split_into_two_leaves_under_one_internal_node() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        for id in (1..=14u32).rev() {
            table.insert(&row(id)).unwrap();
        }

        let dump = table.format_tree().unwrap();
        let expected = concat!(
            " - internal (size 1)\n",
            " - leaf (size 7)\n",
            "  - 1\n",
            "  - 2\n",
            "  - 3\n",
            "  - 4\n",
            "  - 5\n",
            "  - 6\n",
            "  - 7\n",
            " - key 7\n",
            " - leaf (size 7)\n",
            "  - 8\n",
            "  - 9\n",
            "  - 10\n",
            "  - 11\n",
            "  - 12\n",
            "  - 13\n",
            "  - 14\n",
        );
        assert_eq!(dump, expected);

        let ids: Vec<u32> = table.select_rows().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=14).collect::<Vec<_>>());
    }

    #[test]
    fn lone_root_leaf_dump_has_equal_indent_for_header_and_cells() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        for id in [1u32, 2, 3] {
            table.insert(&row(id)).unwrap();
        }

        let dump = table.format_tree().unwrap();
        assert_eq!(dump, " - leaf (size 3)\n - 1\n - 2\n - 3\n");
    }

    #[test]
    fn persists_across_reopen() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        {
            let mut table = Table::open(tmp.path()).unwrap();
            table.insert(&row(1)).unwrap();
            table.close().unwrap();
        }
        let mut table = Table::open(tmp.path()).unwrap();
        let ids: Vec<u32> = table.select_rows().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn shrunk_page_ceiling_turns_a_split_into_a_capacity_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open_with_max_pages(tmp.path(), 1).unwrap();
        for id in 1..=LEAF_NODE_MAX_CELLS as u32 {
            table.insert(&row(id)).unwrap();
        }
        let err = table.insert(&row(LEAF_NODE_MAX_CELLS as u32 + 1)).unwrap_err();
        assert!(matches!(err, Error::Capacity(_)));
    }

    #[test]
    fn constants_dump_matches_exact_format() {
        let expected = concat!(
            "                 ROW_SIZE:   293\n",
            "  COMMON_NODE_HEADER_SIZE:     6\n",
            "    LEAF_NODE_HEADER_SIZE:    14\n",
            "      LEAF_NODE_CELL_SIZE:   297\n",
            "LEAF_NODE_SPACE_FOR_CELLS:  4082\n",
            "      LEAF_NODE_MAX_CELLS:    13\n",
        );
        assert_eq!(Table::format_constants(), expected);
    }
}
