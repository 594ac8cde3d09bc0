// Cache the property keys so we only have to create the js values once
use crate::util::object::Property;
use lazy_static::lazy_static;

lazy_static! {
    // IDBWrapper constructor arguments
    pub static ref DB_NAME_KEY: Property = Property::new("dbName");
    pub static ref DB_VERSION_KEY: Property = Property::new("dbVersion");
    pub static ref UPGRADE_HANDLER_KEY: Property = Property::new("upgradeHandler");
    pub static ref PERSISTENT_KEY: Property = Property::new("persistent");

    // key range settings
    pub static ref QUERY_TYPE_KEY: Property = Property::new("queryType");
    pub static ref DIRECTION_KEY: Property = Property::new("direction");
    pub static ref LOWER_KEY: Property = Property::new("lowerKeyPath");
    pub static ref UPPER_KEY: Property = Property::new("upperBoundKeyPath");
    pub static ref LOWER_EXCLUSIVE_KEY: Property = Property::new("lowerExclusive");
    pub static ref UPPER_EXCLUSIVE_KEY: Property = Property::new("upperExclusive");

    pub static ref ERROR_KEY: Property = Property::new("error");
}
