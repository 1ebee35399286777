/// Данные: таблицы по годам и имена колонок датасета

pub mod columns;
pub mod frame;

pub use frame::{Frame, YEAR_COLUMN};
