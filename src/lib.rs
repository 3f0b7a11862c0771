// src/lib.rs

pub mod config;

pub mod entities {
    pub mod prelude;
    pub mod state_purchases;
}

pub mod models {
    pub mod source_row;
    pub mod state_purchase;
}

pub mod services {
    pub mod purchase_store;
    pub mod schema;
}
