pub mod session_repo;
pub mod ticket_repo;
pub mod user_repo;

pub use session_repo::SessionRepository;
pub use ticket_repo::TicketRepository;
pub use user_repo::UserRepository;
