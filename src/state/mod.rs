pub mod session;

pub use session::{
    Fetched, MatrixState, MoveDirection, SelectedCell, Session, SessionUpdate, Stage,
};
