//! Event bindings for the on-chain orderbook exchange contract.
//!
//! Only the order lifecycle events are bound; administrative events
//! (pause, ownership, protocol share updates, …) are not indexed and fall
//! through the dispatcher's unknown-topic arm.

use alloy_sol_types::sol;

sol! {
    /// The token bundle an order is about.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Asset {
        uint256 tokenId;
        address collection;
        uint96 amount;
    }

    /// Full order tuple as embedded in match events. `price` is the unit
    /// price in wei.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Order {
        uint8 side;
        uint8 saleKind;
        address maker;
        Asset nft;
        uint128 price;
        uint64 expiry;
        uint64 salt;
    }

    /// A new order was placed into the on-chain book.
    #[derive(Debug, PartialEq, Eq)]
    event LogMake(
        bytes32 orderKey,
        uint8 indexed side,
        uint8 indexed saleKind,
        address indexed maker,
        Asset nft,
        uint128 price,
        uint64 expiry,
        uint64 salt
    );

    /// The maker withdrew an order from the book.
    #[derive(Debug, PartialEq, Eq)]
    event LogCancel(
        bytes32 indexed orderKey,
        address indexed maker
    );

    /// Two orders were matched. Which side is the sell order depends on
    /// `makeOrder.side`.
    #[derive(Debug, PartialEq, Eq)]
    event LogMatch(
        bytes32 indexed makeOrderKey,
        bytes32 indexed takeOrderKey,
        Order makeOrder,
        Order takeOrder,
        uint128 fillPrice
    );
}

/// `LibOrder.Side` discriminants.
pub mod side {
    pub const LIST: u8 = 0;
    pub const BID: u8 = 1;
}

/// `LibOrder.SaleKind` discriminants.
pub mod sale_kind {
    pub const FIX_FOR_COLLECTION: u8 = 0;
    pub const FIX_FOR_ITEM: u8 = 1;
}
