mod async_await;
mod executor;
mod interfaces_unions;
