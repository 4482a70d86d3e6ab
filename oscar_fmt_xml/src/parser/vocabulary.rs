// Document structure
pub const TAG_OPENSCENARIO: &str = "OpenSCENARIO";
pub const TAG_FILE_HEADER: &str = "FileHeader";
pub const TAG_PARAMETER_DECLARATIONS: &str = "ParameterDeclarations";
pub const TAG_PARAMETER_DECLARATION: &str = "ParameterDeclaration";
pub const TAG_PARAMETER_ASSIGNMENTS: &str = "ParameterAssignments";
pub const TAG_PARAMETER_ASSIGNMENT: &str = "ParameterAssignment";
pub const TAG_CATALOG_LOCATIONS: &str = "CatalogLocations";
pub const TAG_VEHICLE_CATALOG: &str = "VehicleCatalog";
pub const TAG_PEDESTRIAN_CATALOG: &str = "PedestrianCatalog";
pub const TAG_MISC_OBJECT_CATALOG: &str = "MiscObjectCatalog";
pub const TAG_MANEUVER_CATALOG: &str = "ManeuverCatalog";
pub const TAG_DIRECTORY: &str = "Directory";
pub const TAG_CATALOG: &str = "Catalog";
pub const TAG_CATALOG_REFERENCE: &str = "CatalogReference";
pub const TAG_ROAD_NETWORK: &str = "RoadNetwork";

// Entities
pub const TAG_ENTITIES: &str = "Entities";
pub const TAG_SCENARIO_OBJECT: &str = "ScenarioObject";
pub const TAG_ENTITY_SELECTION: &str = "EntitySelection";
pub const TAG_MEMBERS: &str = "Members";
pub const TAG_ENTITY_REF: &str = "EntityRef";
pub const TAG_VEHICLE: &str = "Vehicle";
pub const TAG_PEDESTRIAN: &str = "Pedestrian";
pub const TAG_MISC_OBJECT: &str = "MiscObject";
pub const TAG_BOUNDING_BOX: &str = "BoundingBox";
pub const TAG_CENTER: &str = "Center";
pub const TAG_DIMENSIONS: &str = "Dimensions";
pub const TAG_OBJECT_CONTROLLER: &str = "ObjectController";
pub const TAG_PERFORMANCE: &str = "Performance";
pub const TAG_AXLES: &str = "Axles";
pub const TAG_PROPERTIES: &str = "Properties";

// Storyboard
pub const TAG_STORYBOARD: &str = "Storyboard";
pub const TAG_INIT: &str = "Init";
pub const TAG_ACTIONS: &str = "Actions";
pub const TAG_PRIVATE: &str = "Private";
pub const TAG_STORY: &str = "Story";
pub const TAG_ACT: &str = "Act";
pub const TAG_MANEUVER_GROUP: &str = "ManeuverGroup";
pub const TAG_ACTORS: &str = "Actors";
pub const TAG_MANEUVER: &str = "Maneuver";
pub const TAG_EVENT: &str = "Event";
pub const TAG_ACTION: &str = "Action";
pub const TAG_START_TRIGGER: &str = "StartTrigger";
pub const TAG_STOP_TRIGGER: &str = "StopTrigger";

// Actions
pub const TAG_GLOBAL_ACTION: &str = "GlobalAction";
pub const TAG_USER_DEFINED_ACTION: &str = "UserDefinedAction";
pub const TAG_PRIVATE_ACTION: &str = "PrivateAction";
pub const TAG_CUSTOM_COMMAND_ACTION: &str = "CustomCommandAction";
pub const TAG_ENTITY_ACTION: &str = "EntityAction";
pub const TAG_ADD_ENTITY_ACTION: &str = "AddEntityAction";
pub const TAG_DELETE_ENTITY_ACTION: &str = "DeleteEntityAction";
pub const TAG_ENVIRONMENT_ACTION: &str = "EnvironmentAction";
pub const TAG_PARAMETER_ACTION: &str = "ParameterAction";
pub const TAG_LONGITUDINAL_ACTION: &str = "LongitudinalAction";
pub const TAG_SPEED_ACTION: &str = "SpeedAction";
pub const TAG_SPEED_ACTION_DYNAMICS: &str = "SpeedActionDynamics";
pub const TAG_SPEED_ACTION_TARGET: &str = "SpeedActionTarget";
pub const TAG_ABSOLUTE_TARGET_SPEED: &str = "AbsoluteTargetSpeed";
pub const TAG_RELATIVE_TARGET_SPEED: &str = "RelativeTargetSpeed";
pub const TAG_LONGITUDINAL_DISTANCE_ACTION: &str = "LongitudinalDistanceAction";
pub const TAG_LATERAL_ACTION: &str = "LateralAction";
pub const TAG_LANE_CHANGE_ACTION: &str = "LaneChangeAction";
pub const TAG_LANE_CHANGE_ACTION_DYNAMICS: &str = "LaneChangeActionDynamics";
pub const TAG_LANE_CHANGE_TARGET: &str = "LaneChangeTarget";
pub const TAG_ABSOLUTE_TARGET_LANE: &str = "AbsoluteTargetLane";
pub const TAG_RELATIVE_TARGET_LANE: &str = "RelativeTargetLane";
pub const TAG_LANE_OFFSET_ACTION: &str = "LaneOffsetAction";
pub const TAG_TELEPORT_ACTION: &str = "TeleportAction";
pub const TAG_VISIBILITY_ACTION: &str = "VisibilityAction";
pub const TAG_ROUTING_ACTION: &str = "RoutingAction";
pub const TAG_ACQUIRE_POSITION_ACTION: &str = "AcquirePositionAction";
pub const TAG_ASSIGN_ROUTE_ACTION: &str = "AssignRouteAction";
pub const TAG_CONTROLLER_ACTION: &str = "ControllerAction";
pub const TAG_SYNCHRONIZE_ACTION: &str = "SynchronizeAction";

// Positions
pub const TAG_POSITION: &str = "Position";
pub const TAG_WORLD_POSITION: &str = "WorldPosition";
pub const TAG_RELATIVE_WORLD_POSITION: &str = "RelativeWorldPosition";
pub const TAG_RELATIVE_OBJECT_POSITION: &str = "RelativeObjectPosition";
pub const TAG_LANE_POSITION: &str = "LanePosition";
pub const TAG_RELATIVE_LANE_POSITION: &str = "RelativeLanePosition";
pub const TAG_ORIENTATION: &str = "Orientation";

// Conditions
pub const TAG_CONDITION_GROUP: &str = "ConditionGroup";
pub const TAG_CONDITION: &str = "Condition";
pub const TAG_BY_ENTITY_CONDITION: &str = "ByEntityCondition";
pub const TAG_TRIGGERING_ENTITIES: &str = "TriggeringEntities";
pub const TAG_ENTITY_CONDITION: &str = "EntityCondition";
pub const TAG_COLLISION_CONDITION: &str = "CollisionCondition";
pub const TAG_BY_TYPE: &str = "ByType";
pub const TAG_TIME_HEADWAY_CONDITION: &str = "TimeHeadwayCondition";
pub const TAG_TIME_TO_COLLISION_CONDITION: &str = "TimeToCollisionCondition";
pub const TAG_ACCELERATION_CONDITION: &str = "AccelerationCondition";
pub const TAG_STAND_STILL_CONDITION: &str = "StandStillCondition";
pub const TAG_SPEED_CONDITION: &str = "SpeedCondition";
pub const TAG_RELATIVE_SPEED_CONDITION: &str = "RelativeSpeedCondition";
pub const TAG_TRAVELED_DISTANCE_CONDITION: &str = "TraveledDistanceCondition";
pub const TAG_REACH_POSITION_CONDITION: &str = "ReachPositionCondition";
pub const TAG_DISTANCE_CONDITION: &str = "DistanceCondition";
pub const TAG_RELATIVE_DISTANCE_CONDITION: &str = "RelativeDistanceCondition";
pub const TAG_END_OF_ROAD_CONDITION: &str = "EndOfRoadCondition";
pub const TAG_OFFROAD_CONDITION: &str = "OffroadCondition";
pub const TAG_BY_VALUE_CONDITION: &str = "ByValueCondition";
pub const TAG_SIMULATION_TIME_CONDITION: &str = "SimulationTimeCondition";
pub const TAG_STORYBOARD_ELEMENT_STATE_CONDITION: &str = "StoryboardElementStateCondition";
pub const TAG_PARAMETER_CONDITION: &str = "ParameterCondition";
pub const TAG_USER_DEFINED_VALUE_CONDITION: &str = "UserDefinedValueCondition";
pub const TAG_TRAFFIC_SIGNAL_CONDITION: &str = "TrafficSignalCondition";

// Attributes
pub const ATTR_NAME: &str = "name";
pub const ATTR_PARAMETER_TYPE: &str = "parameterType";
pub const ATTR_PARAMETER_REF: &str = "parameterRef";
pub const ATTR_VALUE: &str = "value";
pub const ATTR_PATH: &str = "path";
pub const ATTR_CATALOG_NAME: &str = "catalogName";
pub const ATTR_ENTRY_NAME: &str = "entryName";
pub const ATTR_REV_MAJOR: &str = "revMajor";
pub const ATTR_REV_MINOR: &str = "revMinor";
pub const ATTR_DATE: &str = "date";
pub const ATTR_DESCRIPTION: &str = "description";
pub const ATTR_AUTHOR: &str = "author";
pub const ATTR_ENTITY_REF: &str = "entityRef";
pub const ATTR_X: &str = "x";
pub const ATTR_Y: &str = "y";
pub const ATTR_Z: &str = "z";
pub const ATTR_H: &str = "h";
pub const ATTR_P: &str = "p";
pub const ATTR_R: &str = "r";
pub const ATTR_DX: &str = "dx";
pub const ATTR_DY: &str = "dy";
pub const ATTR_DZ: &str = "dz";
pub const ATTR_WIDTH: &str = "width";
pub const ATTR_LENGTH: &str = "length";
pub const ATTR_HEIGHT: &str = "height";
pub const ATTR_ROAD_ID: &str = "roadId";
pub const ATTR_LANE_ID: &str = "laneId";
pub const ATTR_S: &str = "s";
pub const ATTR_OFFSET: &str = "offset";
pub const ATTR_MAXIMUM_EXECUTION_COUNT: &str = "maximumExecutionCount";
pub const ATTR_PRIORITY: &str = "priority";
pub const ATTR_SELECT_TRIGGERING_ENTITIES: &str = "selectTriggeringEntities";
pub const ATTR_DELAY: &str = "delay";
pub const ATTR_CONDITION_EDGE: &str = "conditionEdge";
pub const ATTR_TRIGGERING_ENTITIES_RULE: &str = "triggeringEntitiesRule";
pub const ATTR_RULE: &str = "rule";
pub const ATTR_DURATION: &str = "duration";
pub const ATTR_TOLERANCE: &str = "tolerance";
pub const ATTR_FREESPACE: &str = "freespace";
pub const ATTR_RELATIVE_DISTANCE_TYPE: &str = "relativeDistanceType";
pub const ATTR_OBJECT_TYPE: &str = "objectType";
pub const ATTR_STORYBOARD_ELEMENT_TYPE: &str = "storyboardElementType";
pub const ATTR_STORYBOARD_ELEMENT_REF: &str = "storyboardElementRef";
pub const ATTR_STATE: &str = "state";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_DYNAMICS_SHAPE: &str = "dynamicsShape";
pub const ATTR_DYNAMICS_DIMENSION: &str = "dynamicsDimension";
pub const ATTR_SPEED_TARGET_VALUE_TYPE: &str = "speedTargetValueType";
pub const ATTR_CONTINUOUS: &str = "continuous";
pub const ATTR_TARGET_LANE_OFFSET: &str = "targetLaneOffset";
pub const ATTR_GRAPHICS: &str = "graphics";
pub const ATTR_TRAFFIC: &str = "traffic";
pub const ATTR_SENSORS: &str = "sensors";

/// Tags whose content is accepted without being interpreted.
pub const OPAQUE_TAGS: &[&str] = &[
    TAG_ROAD_NETWORK,
    TAG_OBJECT_CONTROLLER,
    TAG_PERFORMANCE,
    TAG_AXLES,
    TAG_PROPERTIES,
];

/// Tags allowed to carry text content.
pub const TEXT_TAGS: &[&str] = &[TAG_CUSTOM_COMMAND_ACTION];

/// The closed vocabulary of known tags.
pub const KNOWN_TAGS: &[&str] = &[
    TAG_OPENSCENARIO,
    TAG_FILE_HEADER,
    TAG_PARAMETER_DECLARATIONS,
    TAG_PARAMETER_DECLARATION,
    TAG_PARAMETER_ASSIGNMENTS,
    TAG_PARAMETER_ASSIGNMENT,
    TAG_CATALOG_LOCATIONS,
    TAG_VEHICLE_CATALOG,
    TAG_PEDESTRIAN_CATALOG,
    TAG_MISC_OBJECT_CATALOG,
    TAG_MANEUVER_CATALOG,
    TAG_DIRECTORY,
    TAG_CATALOG,
    TAG_CATALOG_REFERENCE,
    TAG_ROAD_NETWORK,
    TAG_ENTITIES,
    TAG_SCENARIO_OBJECT,
    TAG_ENTITY_SELECTION,
    TAG_MEMBERS,
    TAG_ENTITY_REF,
    TAG_VEHICLE,
    TAG_PEDESTRIAN,
    TAG_MISC_OBJECT,
    TAG_BOUNDING_BOX,
    TAG_CENTER,
    TAG_DIMENSIONS,
    TAG_OBJECT_CONTROLLER,
    TAG_PERFORMANCE,
    TAG_AXLES,
    TAG_PROPERTIES,
    TAG_STORYBOARD,
    TAG_INIT,
    TAG_ACTIONS,
    TAG_PRIVATE,
    TAG_STORY,
    TAG_ACT,
    TAG_MANEUVER_GROUP,
    TAG_ACTORS,
    TAG_MANEUVER,
    TAG_EVENT,
    TAG_ACTION,
    TAG_START_TRIGGER,
    TAG_STOP_TRIGGER,
    TAG_GLOBAL_ACTION,
    TAG_USER_DEFINED_ACTION,
    TAG_PRIVATE_ACTION,
    TAG_CUSTOM_COMMAND_ACTION,
    TAG_ENTITY_ACTION,
    TAG_ADD_ENTITY_ACTION,
    TAG_DELETE_ENTITY_ACTION,
    TAG_ENVIRONMENT_ACTION,
    TAG_PARAMETER_ACTION,
    TAG_LONGITUDINAL_ACTION,
    TAG_SPEED_ACTION,
    TAG_SPEED_ACTION_DYNAMICS,
    TAG_SPEED_ACTION_TARGET,
    TAG_ABSOLUTE_TARGET_SPEED,
    TAG_RELATIVE_TARGET_SPEED,
    TAG_LONGITUDINAL_DISTANCE_ACTION,
    TAG_LATERAL_ACTION,
    TAG_LANE_CHANGE_ACTION,
    TAG_LANE_CHANGE_ACTION_DYNAMICS,
    TAG_LANE_CHANGE_TARGET,
    TAG_ABSOLUTE_TARGET_LANE,
    TAG_RELATIVE_TARGET_LANE,
    TAG_LANE_OFFSET_ACTION,
    TAG_TELEPORT_ACTION,
    TAG_VISIBILITY_ACTION,
    TAG_ROUTING_ACTION,
    TAG_ACQUIRE_POSITION_ACTION,
    TAG_ASSIGN_ROUTE_ACTION,
    TAG_CONTROLLER_ACTION,
    TAG_SYNCHRONIZE_ACTION,
    TAG_POSITION,
    TAG_WORLD_POSITION,
    TAG_RELATIVE_WORLD_POSITION,
    TAG_RELATIVE_OBJECT_POSITION,
    TAG_LANE_POSITION,
    TAG_RELATIVE_LANE_POSITION,
    TAG_ORIENTATION,
    TAG_CONDITION_GROUP,
    TAG_CONDITION,
    TAG_BY_ENTITY_CONDITION,
    TAG_TRIGGERING_ENTITIES,
    TAG_ENTITY_CONDITION,
    TAG_COLLISION_CONDITION,
    TAG_BY_TYPE,
    TAG_TIME_HEADWAY_CONDITION,
    TAG_TIME_TO_COLLISION_CONDITION,
    TAG_ACCELERATION_CONDITION,
    TAG_STAND_STILL_CONDITION,
    TAG_SPEED_CONDITION,
    TAG_RELATIVE_SPEED_CONDITION,
    TAG_TRAVELED_DISTANCE_CONDITION,
    TAG_REACH_POSITION_CONDITION,
    TAG_DISTANCE_CONDITION,
    TAG_RELATIVE_DISTANCE_CONDITION,
    TAG_END_OF_ROAD_CONDITION,
    TAG_OFFROAD_CONDITION,
    TAG_BY_VALUE_CONDITION,
    TAG_SIMULATION_TIME_CONDITION,
    TAG_STORYBOARD_ELEMENT_STATE_CONDITION,
    TAG_PARAMETER_CONDITION,
    TAG_USER_DEFINED_VALUE_CONDITION,
    TAG_TRAFFIC_SIGNAL_CONDITION,
];
