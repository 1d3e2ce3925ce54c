pub mod completion;
pub mod detect;
pub mod discover;
pub mod export;
pub mod menu;
pub mod scan_dirs;
pub mod stacks;
pub mod tree;
