mod dispatcher;
mod event_table;
mod registry;

pub(crate) use dispatcher::Dispatcher;
pub(crate) use event_table::EventTable;
pub(crate) use registry::HandlerRegistry;
