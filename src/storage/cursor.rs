//! A cursor is an ephemeral position over a leaf: a page number, a cell
//! index, and an end-of-table flag. It is valid only between the operation
//! that produced it and the one that consumes it — any structural mutation
//! to its page invalidates it.

use super::btree::{self, NodeType};
use super::table::Table;
use crate::errors::Error;

pub struct Cursor<'a> {
    pub table: &'a mut Table,
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// Positions at the leftmost leaf's first cell (the row that would
    /// contain key 0, if any).
    pub fn start(table: &'a mut Table) -> Result<Self, Error> {
        let root_page_num = table.root_page_num;
        let page_num = leftmost_leaf(table, root_page_num)?;
        let num_cells = btree::leaf_node_num_cells(table.pager.get_page(page_num)?);

        Ok(Cursor {
            table,
            page_num,
            cell_num: 0,
            end_of_table: num_cells == 0,
        })
    }

    /// Descends from the root to the leaf that would contain `key`, via
    /// `internal_find_child` at every internal node, then binary-searches
    /// the leaf. `cell_num` lands on the key's cell if present, otherwise on
    /// the slot it would occupy to keep the leaf sorted.
    pub fn find(table: &'a mut Table, key: u32) -> Result<Self, Error> {
        let root_page_num = table.root_page_num;
        let page_num = descend_to_leaf(table, root_page_num, key)?;
        let cell_num = leaf_find(table, page_num, key)?;

        Ok(Cursor {
            table,
            page_num,
            cell_num,
            end_of_table: false,
        })
    }

    /// Copies the row image at the cursor's cell into `buf`.
    pub fn value(&mut self) -> Result<Vec<u8>, Error> {
        let page = self.table.pager.get_page(self.page_num)?;
        Ok(btree::leaf_node_value(page, self.cell_num as usize).to_vec())
    }

    /// Moves to the next cell in key order, chasing `next_leaf_page_num`
    /// once the current leaf is exhausted. Sets `end_of_table` once the
    /// rightmost leaf (whose `next_leaf_page_num` is 0) is exhausted.
    pub fn advance(&mut self) -> Result<(), Error> {
        let page = self.table.pager.get_page(self.page_num)?;
        let num_cells = btree::leaf_node_num_cells(page);
        self.cell_num += 1;

        if self.cell_num >= num_cells {
            let next_leaf = btree::leaf_node_next_leaf(page);
            if next_leaf == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next_leaf;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}

fn leftmost_leaf(table: &mut Table, page_num: u32) -> Result<u32, Error> {
    let page = table.pager.get_page(page_num)?;
    match btree::node_type(page)? {
        NodeType::Leaf => Ok(page_num),
        NodeType::Internal => {
            let child = btree::internal_node_child(page, 0);
            leftmost_leaf(table, child)
        }
    }
}

fn descend_to_leaf(table: &mut Table, page_num: u32, key: u32) -> Result<u32, Error> {
    let page = table.pager.get_page(page_num)?;
    match btree::node_type(page)? {
        NodeType::Leaf => Ok(page_num),
        NodeType::Internal => {
            let child_index = btree::internal_find_child(page, key);
            let child = btree::internal_node_child(page, child_index);
            descend_to_leaf(table, child, key)
        }
    }
}

fn leaf_find(table: &mut Table, page_num: u32, key: u32) -> Result<u32, Error> {
    let page = table.pager.get_page(page_num)?;
    let num_cells = btree::leaf_node_num_cells(page);

    let mut lo = 0u32;
    let mut hi = num_cells;
    while lo != hi {
        let mid = lo + (hi - lo) / 2;
        let key_at_mid = btree::leaf_node_key(page, mid as usize);
        if key == key_at_mid {
            return Ok(mid);
        }
        if key < key_at_mid {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Ok(lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::row::Row;

    #[test]
    fn start_on_empty_table_is_end_of_table() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        let cursor = Cursor::start(&mut table).unwrap();
        assert!(cursor.end_of_table);
    }

    #[test]
    fn find_on_empty_leaf_lands_at_cell_zero() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        let cursor = Cursor::find(&mut table, 5).unwrap();
        assert_eq!(cursor.cell_num, 0);
    }

    #[test]
    fn advance_walks_cells_in_ascending_order() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        for id in [3u32, 1, 2] {
            table
                .insert(&Row::new(id, "u", "e@example.com").unwrap())
                .unwrap();
        }

        let mut cursor = Cursor::start(&mut table).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            let row = Row::deserialize(&cursor.value().unwrap()).unwrap();
            seen.push(row.id);
            cursor.advance().unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
