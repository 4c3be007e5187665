//! Microsoft SQL Server database driver.
//!
//! Uses a single Tiberius client over a Tokio TCP stream. Parameterized
//! types (`nvarchar(50)`, `float(24)`, `decimal(18,2)`) are rebuilt from
//! `sys.columns` so the translator can see precision.

mod driver;

pub use driver::MssqlDriver;
