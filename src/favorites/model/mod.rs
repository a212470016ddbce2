mod basket;
mod cursor;
mod entry;
pub(crate) mod ids;

pub use basket::{BasketScope, FavoriteBasket};
pub use cursor::PageCursor;
pub use entry::{FavoriteAttributes, FavoriteDocument, FavoriteEntry, ProductSnapshot};
