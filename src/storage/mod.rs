pub mod btree;
pub mod cursor;
pub mod pager;
pub mod row;
pub mod table;

pub use cursor::Cursor;
pub use pager::{Pager, MAX_PAGES, PAGE_SIZE};
pub use row::Row;
pub use table::Table;
