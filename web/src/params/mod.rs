pub(crate) mod alert;
