pub type CmdResult<T> = db_assert::Result<(T, i32)>;

pub mod rewrite;
