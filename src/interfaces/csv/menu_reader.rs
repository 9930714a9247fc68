use crate::domain::menu::NewMenuItem;
use crate::domain::money::Money;
use crate::error::{PosError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a menu import file. Optional columns may be left empty.
#[derive(Debug, Deserialize)]
struct MenuRow {
    name: String,
    price: Decimal,
    category: String,
    #[serde(default)]
    subcategory: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    is_available: Option<bool>,
}

impl TryFrom<MenuRow> for NewMenuItem {
    type Error = PosError;

    fn try_from(row: MenuRow) -> Result<Self> {
        Ok(Self {
            name: row.name,
            price: Money::new(row.price)?,
            category: row.category,
            subcategory: row.subcategory.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            image_url: row.image_url.unwrap_or_default(),
            is_available: row.is_available.unwrap_or(true),
        })
    }
}

/// Reads menu items from a CSV source with the header
/// `name,price,category,subcategory,description,image_url,is_available`.
///
/// Fields are trimmed and short rows are accepted; category checks happen
/// when the items are created.
pub struct MenuReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> MenuReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily yields one result per data row.
    pub fn items(self) -> impl Iterator<Item = Result<NewMenuItem>> {
        self.reader
            .into_deserialize::<MenuRow>()
            .map(|row| row.map_err(PosError::from).and_then(NewMenuItem::try_from))
    }
}
