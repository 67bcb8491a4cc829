pub mod certificates;
pub mod order;
pub mod prepay;
pub mod refund;
