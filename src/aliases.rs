use diesel_async::{AsyncPgConnection, pooled_connection::bb8};

pub type DieselError = diesel::result::Error;
pub type DbPool = bb8::Pool<AsyncPgConnection>;
