pub mod event;
pub mod extract;
pub mod order;
pub mod response;
pub mod ticket;
pub mod user;

pub use self::{
    event::Event, order::Order, response::Response, ticket::Ticket,
    user::User,
};
