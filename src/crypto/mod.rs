pub mod decrypt;
pub mod pem;
pub mod sign;
pub mod verify;
